//! Shared fixtures for the integration tests.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use image::{Rgb, RgbImage};
use photosweep::cache::FingerprintCache;
use photosweep::cli::{normalize_legacy_args, Cli};
use photosweep::duplicates::{EngineConfig, HashFailure, HashRun, HashingEngine};
use photosweep::error::ExitCode;
use photosweep::scanner::{
    Fingerprint, FingerprintError, Fingerprinter, PixelFingerprinter, Walker,
};

/// A small image whose pixels depend on `seed`.
pub fn picture(seed: u8) -> RgbImage {
    RgbImage::from_fn(12, 9, |x, y| {
        Rgb([(x as u8).wrapping_mul(seed), (y as u8).wrapping_mul(17), seed])
    })
}

/// Save `picture(seed)`; the container follows the extension.
pub fn write_image(path: &Path, seed: u8) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    picture(seed).save(path).unwrap();
}

/// Write raw bytes, creating parent directories.
pub fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Pixel fingerprinter that counts its calls.
#[derive(Default)]
pub struct CountingFingerprinter {
    inner: PixelFingerprinter,
    calls: AtomicUsize,
}

impl CountingFingerprinter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fingerprinter for CountingFingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fingerprint(path)
    }
}

pub fn fast_engine(fingerprinter: Arc<dyn Fingerprinter>, workers: usize) -> HashingEngine {
    HashingEngine::new(
        fingerprinter,
        EngineConfig::default()
            .with_workers(workers)
            .with_poll_interval(Duration::from_millis(5)),
    )
}

/// Walk and fingerprint `root` with its own cache, without saving.
pub fn try_hash_tree(
    root: &Path,
    fingerprinter: Arc<dyn Fingerprinter>,
    workers: usize,
) -> Result<HashRun, HashFailure> {
    let walk = Walker::new(root).walk().unwrap();
    let cache = FingerprintCache::for_root(root).unwrap();
    fast_engine(fingerprinter, workers).hash_all(walk.records, cache)
}

/// Walk, fingerprint and save the cache of `root`.
pub fn hash_tree(root: &Path, fingerprinter: Arc<dyn Fingerprinter>) -> HashRun {
    let run = try_hash_tree(root, fingerprinter, 4).unwrap();
    run.cache.save().unwrap();
    run
}

/// Run the whole application with legacy-flag normalization, capturing the report.
pub fn run_cli(args: &[&str]) -> (anyhow::Result<ExitCode>, String) {
    let mut argv = vec!["photosweep", "-q"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(normalize_legacy_args(argv)).unwrap();
    let mut out = Vec::new();
    let result = photosweep::run_app_with_output(cli, &mut out, false);
    (result, String::from_utf8(out).unwrap())
}

pub fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}
