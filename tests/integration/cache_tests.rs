use std::fs;
use std::sync::Arc;

use filetime::{set_file_mtime, FileTime};
use photosweep::cache::{CacheError, FingerprintCache};
use photosweep::duplicates::detect;
use photosweep::scanner::{PixelFingerprinter, CACHE_FILE_NAME};
use tempfile::tempdir;

use super::helpers::{hash_tree, write_file, write_image, CountingFingerprinter};

#[test]
fn test_second_run_uses_cache() {
    let dir = tempdir().unwrap();
    write_image(&dir.path().join("a.png"), 3);
    write_image(&dir.path().join("sub/b.bmp"), 5);
    write_file(&dir.path().join("notes.txt"), b"not an image");

    let fp = Arc::new(CountingFingerprinter::default());
    let first = hash_tree(dir.path(), fp.clone());
    assert_eq!(fp.calls(), 2);
    assert_eq!(first.stats.hashed, 2);
    assert!(dir.path().join(CACHE_FILE_NAME).is_file());

    let second = hash_tree(dir.path(), fp.clone());
    assert_eq!(fp.calls(), 2, "unchanged files must not be fingerprinted again");
    assert_eq!(second.stats.cache_hits, 2);
    assert_eq!(second.stats.hashed, 0);

    let digests = |run: &photosweep::duplicates::HashRun| {
        run.records
            .iter()
            .map(|r| r.digest.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(digests(&first), digests(&second));
}

#[test]
fn test_touched_file_is_recomputed() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.png");
    write_image(&a, 3);
    write_image(&dir.path().join("b.png"), 4);

    let fp = Arc::new(CountingFingerprinter::default());
    hash_tree(dir.path(), fp.clone());
    assert_eq!(fp.calls(), 2);

    set_file_mtime(&a, FileTime::from_unix_time(1_500_000_000, 0)).unwrap();
    let run = hash_tree(dir.path(), fp.clone());

    assert_eq!(fp.calls(), 3);
    assert_eq!(run.stats.cache_hits, 1);
    assert_eq!(run.stats.hashed, 1);
}

#[test]
fn test_untouched_cache_is_not_rewritten() {
    let dir = tempdir().unwrap();
    write_image(&dir.path().join("a.png"), 3);

    let fp = Arc::new(CountingFingerprinter::default());
    hash_tree(dir.path(), fp.clone());

    let sidecar = dir.path().join(CACHE_FILE_NAME);
    let before = fs::read_to_string(&sidecar).unwrap();
    let cache = FingerprintCache::for_root(dir.path()).unwrap();
    assert_eq!(cache.len(), 1);
    assert!(!cache.save().unwrap());
    assert_eq!(fs::read_to_string(&sidecar).unwrap(), before);
}

#[test]
fn test_tampered_sidecar_is_rejected() {
    let dir = tempdir().unwrap();
    write_image(&dir.path().join("a.png"), 3);

    let run = hash_tree(dir.path(), Arc::new(CountingFingerprinter::default()));
    let digest = run.records[0].digest.clone().unwrap();

    let sidecar = dir.path().join(CACHE_FILE_NAME);
    let content = fs::read_to_string(&sidecar).unwrap();
    fs::write(&sidecar, content.replace(&digest, &"0".repeat(64))).unwrap();

    let err = FingerprintCache::for_root(dir.path()).unwrap_err();
    assert!(matches!(err, CacheError::Checksum(_)), "got {err:?}");
}

#[test]
fn test_corrupt_image_is_cached() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("broken.png"), b"this is not a png");

    let fp = Arc::new(CountingFingerprinter::default());
    let first = hash_tree(dir.path(), fp.clone());
    assert!(first.records[0].corrupt);

    let second = hash_tree(dir.path(), fp.clone());
    assert_eq!(fp.calls(), 1);
    assert!(second.records[0].corrupt);
    assert!(second.records[0].digest.is_none());
}

#[test]
fn test_case_siblings_are_not_duplicates() {
    let dir = tempdir().unwrap();
    let upper = dir.path().join("IMG.png");
    let lower = dir.path().join("img.png");
    write_image(&upper, 1);
    write_image(&lower, 200);
    if fs::read_dir(dir.path()).unwrap().count() < 2 {
        return;
    }
    let stamp = FileTime::from_unix_time(1_600_000_000, 0);
    set_file_mtime(&upper, stamp).unwrap();
    set_file_mtime(&lower, stamp).unwrap();

    for _ in 0..2 {
        let run = hash_tree(dir.path(), Arc::new(PixelFingerprinter::new()));
        assert_ne!(run.records[0].key, run.records[1].key);
        assert!(detect(run.records).duplicates.is_empty());
    }
}

#[cfg(unix)]
#[test]
fn test_non_utf8_name_keeps_cache() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let latin1 = dir.path().join(OsStr::from_bytes(b"caf\xe9.png"));
    if fs::write(&latin1, b"").is_err() {
        // Filesystem rejects non-UTF-8 names.
        return;
    }
    write_image(&latin1, 4);
    write_image(&dir.path().join("good.png"), 5);

    let fp = Arc::new(CountingFingerprinter::default());
    hash_tree(dir.path(), fp.clone());
    assert_eq!(fp.calls(), 2);
    assert!(dir.path().join(CACHE_FILE_NAME).exists());

    let second = hash_tree(dir.path(), fp.clone());
    assert_eq!(fp.calls(), 2);
    assert_eq!(second.stats.cache_hits, 2);
}
