use std::path::Path;
use std::sync::Arc;

use photosweep::duplicates::{detect, FirstSeen};
use photosweep::reconcile::{plan_copies, plan_orphans, reconcile, CopyReason, MatchKind};
use photosweep::scanner::{PixelFingerprinter, CACHE_FILE_NAME, DESKTOP_METADATA_FILE, PROTECT_MARKER};
use tempfile::tempdir;

use super::helpers::{try_hash_tree, write_file, write_image};

fn first_seen(root: &Path) -> FirstSeen {
    let run = try_hash_tree(root, Arc::new(PixelFingerprinter::new()), 4).unwrap();
    detect(run.records).first_seen
}

#[test]
fn test_renamed_file_matches_exact_content() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_file(&src.path().join("2019/img.mp4"), b"identical movie bytes");
    write_file(&dest.path().join("photo.mp4"), b"identical movie bytes");

    let result = reconcile(&first_seen(src.path()), &first_seen(dest.path()));

    assert!(result.missing.is_empty());
    assert_eq!(result.found_elsewhere.len(), 1);
    let matched = &result.found_elsewhere[0].matched;
    assert_eq!(matched.kind, MatchKind::ExactContent);
    assert_eq!(matched.candidate.as_ref().unwrap().file_name(), "img.mp4");
}

#[test]
fn test_renamed_image_shares_the_source_key() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_image(&src.path().join("img.png"), 11);
    write_image(&dest.path().join("photo.bmp"), 11);

    let result = reconcile(&first_seen(src.path()), &first_seen(dest.path()));

    assert!(result.missing.is_empty());
    assert!(result.found_elsewhere.is_empty());
}

#[test]
fn test_same_length_different_bytes_is_not_exact() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_file(&src.path().join("a.mp4"), b"aaaaaaaaaa");
    write_file(&dest.path().join("b.mp4"), b"bbbbbbbbbb");

    let result = reconcile(&first_seen(src.path()), &first_seen(dest.path()));

    assert_eq!(result.missing.len(), 1);
    assert_eq!(result.missing[0].matched.kind, MatchKind::None);
}

#[test]
fn test_name_match_thresholds() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    // 1000 vs 995: under 1%
    write_file(&src.path().join("x/near.mp4"), &[1; 995]);
    write_file(&dest.path().join("near.mp4"), &[2; 1000]);
    // 1000 vs 980: 2%, still found elsewhere
    write_file(&src.path().join("x/drift.mp4"), &[1; 980]);
    write_file(&dest.path().join("drift.mp4"), &[2; 1000]);
    // 1000 vs 900: 10%, missing
    write_file(&src.path().join("x/far.mp4"), &[1; 900]);
    write_file(&dest.path().join("far.mp4"), &[2; 1000]);

    let result = reconcile(&first_seen(src.path()), &first_seen(dest.path()));

    let kind_of = |name: &str| {
        result
            .found_elsewhere
            .iter()
            .chain(&result.missing)
            .find(|e| e.dest.file_name() == name)
            .map(|e| e.matched.kind)
            .unwrap()
    };
    assert_eq!(kind_of("near.mp4"), MatchKind::NameAndSize);
    assert_eq!(kind_of("drift.mp4"), MatchKind::NameOnly);
    assert_eq!(kind_of("far.mp4"), MatchKind::NameOnly);

    assert_eq!(result.found_elsewhere.len(), 2);
    assert_eq!(result.missing.len(), 1);
    assert_eq!(result.missing[0].dest.file_name(), "far.mp4");
}

#[test]
fn test_copy_plan_skips_excluded_and_equal_files() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_file(&src.path().join("same.mp4"), b"12345");
    write_file(&dest.path().join("same.mp4"), b"54321");
    write_file(&src.path().join("grown.mp4"), b"longer now");
    write_file(&dest.path().join("grown.mp4"), b"short");
    write_file(&src.path().join("a/new.mp4"), b"new");
    write_file(&src.path().join(DESKTOP_METADATA_FILE), b"[.ShellClassInfo]");
    write_file(&src.path().join("readme.txt"), b"hello");

    let plan = plan_copies(src.path(), dest.path(), &first_seen(src.path()));
    let mut planned: Vec<_> = plan
        .iter()
        .map(|c| (c.source.file_name().into_owned(), c.reason, c.nonstandard))
        .collect();
    planned.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        planned,
        vec![
            ("grown.mp4".to_string(), CopyReason::SizeDiffers { dest_size: 5 }, false),
            ("new.mp4".to_string(), CopyReason::Absent, false),
            ("readme.txt".to_string(), CopyReason::Absent, true),
        ]
    );
    assert!(plan.iter().all(|c| c.dest.starts_with(dest.path())));
}

#[test]
fn test_orphan_plan_respects_marker() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_file(&src.path().join("kept/a.mp4"), b"a");
    write_file(&dest.path().join("kept/a.mp4"), b"a");
    write_file(&dest.path().join("kept/gone.mp4"), b"g");
    write_file(&dest.path().join("old/x.mp4"), b"x");
    write_file(&dest.path().join("archive").join(PROTECT_MARKER), b"");
    write_file(&dest.path().join("archive/y.mp4"), b"y");
    write_file(&dest.path().join(CACHE_FILE_NAME), b"{}");

    let plan = plan_orphans(src.path(), dest.path());

    assert_eq!(plan.files, vec![dest.path().join("kept/gone.mp4")]);
    assert_eq!(plan.directories, vec![dest.path().join("old")]);
    assert!(plan.errors.is_empty());
}
