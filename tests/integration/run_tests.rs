//! End-to-end runs through `run_app_with_output`.

use std::fs;

use photosweep::error::ExitCode;
use photosweep::scanner::{CACHE_FILE_NAME, PROTECT_MARKER};
use tempfile::tempdir;

use super::helpers::{arg, run_cli, write_file, write_image};

#[test]
fn test_delete_removes_later_pixel_duplicate_only() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("a_copy.bmp");
    write_image(&a, 21);
    write_image(&b, 21);
    write_image(&dir.path().join("unique.png"), 22);

    let (result, out) = run_cli(&["-s", arg(dir.path()), "-delete"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.contains("Duplicates (1)"), "{out}");
    assert!(out.contains("Deleted 1 item(s)"), "{out}");
    assert!(a.exists());
    assert!(!b.exists());
    assert!(dir.path().join(CACHE_FILE_NAME).is_file());

    let (result, out) = run_cli(&["-s", arg(dir.path()), "--delete"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.contains("Duplicates (0)"), "{out}");
    assert!(out.contains("Deleted 0 item(s)"), "{out}");
    assert!(out.contains("0 of 2 files"), "{out}");
}

#[test]
fn test_duplicates_across_sources_keep_first_source() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write_image(&first.path().join("z.png"), 30);
    write_image(&second.path().join("a.png"), 30);

    let (result, _) = run_cli(&[
        "-s",
        arg(first.path()),
        "-s",
        arg(second.path()),
        "--delete",
    ]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(first.path().join("z.png").exists());
    assert!(!second.path().join("a.png").exists());
}

#[test]
fn test_non_media_duplicates_are_reported_not_deleted() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("one/notes.txt"), b"same length");
    write_file(&dir.path().join("two/notes.txt"), b"same length");

    let (result, out) = run_cli(&["-s", arg(dir.path()), "--delete"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.contains("not an image file"), "{out}");
    assert!(dir.path().join("one/notes.txt").exists());
    assert!(dir.path().join("two/notes.txt").exists());
}

#[test]
fn test_protected_directory_is_never_deleted() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("safe").join(PROTECT_MARKER), b"");
    write_image(&dir.path().join("safe/a.png"), 40);
    write_image(&dir.path().join("safe/b.png"), 40);

    let (result, out) = run_cli(&["-s", arg(dir.path()), "--delete"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.contains("Duplicates (0)"), "{out}");
    assert!(dir.path().join("safe/a.png").exists());
    assert!(dir.path().join("safe/b.png").exists());
}

#[test]
fn test_report_missing_html() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_file(&src.path().join("clip.mp4"), b"movie bytes");
    write_file(&dest.path().join("renamed.mp4"), b"movie bytes");
    write_file(&dest.path().join("lost & found.mp4"), b"nobody has these");
    write_file(&dest.path().join("again/lost & found.mp4"), b"nobody has these");

    let (result, out) = run_cli(&[
        "-s",
        arg(src.path()),
        "-d",
        arg(dest.path()),
        "-reportMissing",
        "-html",
    ]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.starts_with("<!DOCTYPE html>"), "{out}");
    assert!(out.contains("contains 1 duplicate(s)"), "{out}");
    assert!(out.contains("1 missing, 1 found elsewhere"), "{out}");
    assert!(out.contains("identical content"), "{out}");
    assert!(out.contains("MISSING"), "{out}");
    assert!(out.contains("lost &amp; found.mp4"), "{out}");
    assert!(dest.path().join("renamed.mp4").exists());
}

#[test]
fn test_missing_directory_is_usage_error() {
    let dir = tempdir().unwrap();
    let (result, out) = run_cli(&["-s", arg(&dir.path().join("absent"))]);
    let err = result.unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::UsageError);
    assert!(out.is_empty());
}

#[test]
fn test_bad_config_is_usage_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("photosweep.toml");
    fs::write(&config, "hash_workers = \"lots\"\n").unwrap();

    let (result, _) = run_cli(&["-s", arg(dir.path()), "--config", arg(&config)]);
    let err = result.unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::UsageError);
}

#[test]
fn test_destination_with_several_sources_exits_cleanly() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_file(&a.path().join("x.mp4"), b"x");

    let (result, out) = run_cli(&[
        "-s",
        arg(a.path()),
        "-s",
        arg(b.path()),
        "-d",
        arg(dest.path()),
        "-copy",
    ]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.is_empty());
    assert!(!dest.path().join("x.mp4").exists());
}

#[test]
fn test_mirror_is_idempotent() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_image(&src.path().join("2024/jan/a.png"), 50);
    write_file(&src.path().join("2024/jan/clip.mp4"), b"clip");
    write_file(&dest.path().join("2023/old.mp4"), b"old");

    let (result, out) = run_cli(&["-s", arg(src.path()), "-d", arg(dest.path()), "-copy", "-delete"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.contains("Copying 2 file(s)"), "{out}");
    assert!(dest.path().join("2024/jan/a.png").is_file());
    assert!(!dest.path().join("2023").exists());

    let (result, out) = run_cli(&["-s", arg(src.path()), "-d", arg(dest.path()), "-copy", "-delete"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(out.contains("Copying 0 file(s)"), "{out}");
    assert!(out.contains("Deleting 0 orphan file(s) and 0 orphan directory(ies)"), "{out}");
}
