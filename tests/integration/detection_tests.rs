use std::sync::Arc;

use photosweep::duplicates::detect;
use photosweep::scanner::{FileRecord, PixelFingerprinter, PROTECT_MARKER};
use tempfile::tempdir;

use super::helpers::{try_hash_tree, write_file, write_image};

fn hashed(root: &std::path::Path) -> Vec<FileRecord> {
    try_hash_tree(root, Arc::new(PixelFingerprinter::new()), 4)
        .unwrap()
        .records
}

#[test]
fn test_protect_marker_suppresses_duplicates() {
    let dir = tempdir().unwrap();
    let keep = dir.path().join("keep");
    write_file(&keep.join(PROTECT_MARKER), b"");
    write_image(&keep.join("a.png"), 9);
    write_image(&keep.join("b.png"), 9);
    write_image(&keep.join("nested/c.bmp"), 9);

    let detection = detect(hashed(dir.path()));

    assert!(detection.duplicates.is_empty());
    assert_eq!(detection.protected_skips, 2);
}

#[test]
fn test_unprotected_copy_of_protected_file_is_kept() {
    let dir = tempdir().unwrap();
    write_image(&dir.path().join("loose.png"), 9);
    write_file(&dir.path().join("vault").join(PROTECT_MARKER), b"");
    write_image(&dir.path().join("vault/original.png"), 9);

    let detection = detect(hashed(dir.path()));

    assert!(detection.duplicates.is_empty());
    assert_eq!(detection.first_seen.len(), 1);
}

#[test]
fn test_pixel_duplicates_across_containers() {
    let dir = tempdir().unwrap();
    write_image(&dir.path().join("a.png"), 7);
    write_image(&dir.path().join("a_copy.bmp"), 7);
    write_image(&dir.path().join("other.png"), 8);

    let detection = detect(hashed(dir.path()));

    assert_eq!(detection.duplicates.len(), 1);
    assert_eq!(detection.duplicates[0].file_name(), "a_copy.bmp");
    let original = detection.original_of(&detection.duplicates[0]).unwrap();
    assert_eq!(original.file_name(), "a.png");
}

#[test]
fn test_non_images_match_on_name_and_size() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("2023/clip.mp4"), b"first take");
    write_file(&dir.path().join("2024/clip.mp4"), b"other take");
    write_file(&dir.path().join("2024/clip2.mp4"), b"first take");

    let detection = detect(hashed(dir.path()));

    assert_eq!(detection.duplicates.len(), 1);
    assert!(detection.duplicates[0].path.ends_with("2024/clip.mp4"));
}

#[test]
fn test_corrupt_images_are_never_duplicates() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("x.png"), b"garbage");
    write_file(&dir.path().join("y.png"), b"garbage");

    let detection = detect(hashed(dir.path()));

    assert!(detection.duplicates.is_empty());
    assert_eq!(detection.corrupt.len(), 2);
    assert!(detection.first_seen.is_empty());
}
