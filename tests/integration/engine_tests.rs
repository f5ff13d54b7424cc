use std::io;
use std::path::Path;
use std::sync::Arc;

use photosweep::cache::FingerprintCache;
use photosweep::duplicates::EngineError;
use photosweep::error::ExitCode;
use photosweep::scanner::{Fingerprint, FingerprintError, Fingerprinter, PixelFingerprinter};
use tempfile::tempdir;

use super::helpers::{try_hash_tree, write_file, write_image};

/// Reads like the pixel fingerprinter, except for files named `unreadable.*`.
struct FlakyDisk;

impl Fingerprinter for FlakyDisk {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        if path.file_stem().is_some_and(|s| s == "unreadable") {
            return Err(FingerprintError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        PixelFingerprinter::new().fingerprint(path)
    }
}

#[test]
fn test_worker_fault_returns_partial_cache() {
    let dir = tempdir().unwrap();
    write_image(&dir.path().join("a.png"), 1);
    write_image(&dir.path().join("b.png"), 2);
    write_image(&dir.path().join("unreadable.png"), 3);
    write_image(&dir.path().join("z.png"), 4);

    // One worker keeps the walk order, so the fault comes after a and b.
    let failure = try_hash_tree(dir.path(), Arc::new(FlakyDisk), 1).unwrap_err();

    assert!(matches!(failure.error, EngineError::Worker { .. }));
    assert_eq!(failure.partial_cache.computed(), 2);
    assert!(failure.partial_cache.save().unwrap());

    let reloaded = FingerprintCache::for_root(dir.path()).unwrap();
    assert_eq!(reloaded.len(), 2);

    let err = anyhow::Error::new(failure.error);
    assert_eq!(ExitCode::for_error(&err), ExitCode::WorkerFault);
}

#[test]
fn test_results_follow_walk_order() {
    let dir = tempdir().unwrap();
    for (i, name) in ["d.png", "a.png", "c.png", "b.png", "e.txt"].iter().enumerate() {
        if name.ends_with(".png") {
            write_image(&dir.path().join(name), i as u8 + 1);
        } else {
            write_file(&dir.path().join(name), b"text");
        }
    }

    let run = try_hash_tree(dir.path(), Arc::new(PixelFingerprinter::new()), 4).unwrap();
    let names: Vec<_> = run.records.iter().map(|r| r.file_name().into_owned()).collect();

    assert_eq!(names, ["a.png", "b.png", "c.png", "d.png", "e.txt"]);
    assert_eq!(run.stats.processed, 5);
    assert_eq!(run.stats.hashed, 4);
    assert_eq!(run.records[4].key, "e.txt:4");
}
