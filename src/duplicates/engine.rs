//! Concurrent fingerprinting engine.
//!
//! # Overview
//!
//! The engine drains a list of walked [`FileRecord`]s through a fixed-size
//! worker pool. Each worker repeatedly takes the next record from a shared
//! FIFO queue, consults the [`FingerprintCache`], calls the
//! [`Fingerprinter`] on a miss, and appends the updated record to a shared
//! result collection. The calling thread blocks and polls the shared
//! counters for progress until every worker has exited.
//!
//! Results are re-ordered into walk order before they are returned, so the
//! downstream duplicate detection does not depend on thread scheduling.
//!
//! # Failure
//!
//! An unreadable file or a panicking fingerprinter aborts the run: the other
//! workers stop before their next dequeue and [`HashingEngine::hash_all`]
//! returns a [`HashFailure`] carrying the cache as it stood, so the caller
//! can persist the work already done.
//!
//! # Example
//!
//! ```no_run
//! use photosweep::cache::FingerprintCache;
//! use photosweep::duplicates::{EngineConfig, HashingEngine};
//! use photosweep::scanner::{PixelFingerprinter, Walker};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let root = Path::new("/photos");
//! let walked = Walker::new(root).walk().unwrap();
//! let cache = FingerprintCache::for_root(root).unwrap();
//!
//! let engine = HashingEngine::new(Arc::new(PixelFingerprinter::new()), EngineConfig::default());
//! match engine.hash_all(walked.records, cache) {
//!     Ok(run) => {
//!         println!("{} cache hits", run.stats.cache_hits);
//!         run.cache.save().unwrap();
//!     }
//!     Err(failure) => {
//!         let _ = failure.partial_cache.save();
//!         eprintln!("{}", failure.error);
//!     }
//! }
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cache::FingerprintCache;
use crate::progress::ProgressCallback;
use crate::scanner::{is_hashable_image, FileRecord, Fingerprint, FingerprintError, Fingerprinter};

/// Default number of hashing workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default interval at which the calling thread polls for progress.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration for the hashing engine.
#[derive(Clone)]
pub struct EngineConfig {
    /// Number of worker threads.
    /// Default is 4 to prevent disk thrashing.
    pub workers: usize,
    /// How often the calling thread wakes to report progress.
    pub poll_interval: Duration,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("workers", &self.workers)
            .field("poll_interval", &self.poll_interval)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl EngineConfig {
    /// Set the number of worker threads (minimum 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the progress polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Errors that abort a hashing run.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A worker could not read a file.
    #[error("Hashing failed for {path}: {source}")]
    Worker {
        /// File being fingerprinted
        path: PathBuf,
        /// The underlying fingerprint error
        #[source]
        source: FingerprintError,
    },

    /// A worker panicked while processing a file.
    #[error("Hashing worker panicked on {path}: {message}")]
    Panicked {
        /// File being fingerprinted
        path: PathBuf,
        /// Panic payload, if it was a string
        message: String,
    },

    /// The worker pool could not be created.
    #[error("Failed to build hashing thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Hashing interrupted by user")]
    Interrupted,
}

impl EngineError {
    /// Check if this error represents a user interruption.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Counters from a hashing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashStats {
    /// Records handed to the engine
    pub files: usize,
    /// Records that made it through a worker
    pub processed: usize,
    /// Fingerprinter invocations
    pub hashed: usize,
    /// Records answered from the cache
    pub cache_hits: usize,
    /// Records flagged as undecodable (fresh or cached)
    pub corrupt: usize,
}

/// Successful result of [`HashingEngine::hash_all`].
#[derive(Debug)]
pub struct HashRun {
    /// Records in walk order, with digests applied
    pub records: Vec<FileRecord>,
    /// Cache updated with every freshly computed fingerprint
    pub cache: FingerprintCache,
    /// Run counters
    pub stats: HashStats,
}

/// Fatal result of [`HashingEngine::hash_all`].
#[derive(Debug)]
pub struct HashFailure {
    /// What stopped the run
    pub error: EngineError,
    /// Cache holding everything computed before the abort
    pub partial_cache: FingerprintCache,
}

impl std::fmt::Display for HashFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Marks a worker as finished even if it unwinds.
struct FinishGuard<'a>(&'a AtomicUsize);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Per-run state shared by reference with every worker.
struct RunContext<'a> {
    queue: Mutex<VecDeque<(usize, FileRecord)>>,
    cache: Mutex<FingerprintCache>,
    results: Mutex<Vec<(usize, FileRecord)>>,
    processed: AtomicUsize,
    hashed: AtomicUsize,
    cache_hits: AtomicUsize,
    corrupt: AtomicUsize,
    finished_workers: AtomicUsize,
    abort: AtomicBool,
    fault: Mutex<Option<EngineError>>,
    fingerprinter: &'a dyn Fingerprinter,
    shutdown: Option<&'a AtomicBool>,
}

impl<'a> RunContext<'a> {
    fn new(
        records: Vec<FileRecord>,
        cache: FingerprintCache,
        fingerprinter: &'a dyn Fingerprinter,
        shutdown: Option<&'a AtomicBool>,
    ) -> Self {
        let total = records.len();
        Self {
            queue: Mutex::new(records.into_iter().enumerate().collect()),
            cache: Mutex::new(cache),
            results: Mutex::new(Vec::with_capacity(total)),
            processed: AtomicUsize::new(0),
            hashed: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
            corrupt: AtomicUsize::new(0),
            finished_workers: AtomicUsize::new(0),
            abort: AtomicBool::new(false),
            fault: Mutex::new(None),
            fingerprinter,
            shutdown,
        }
    }

    /// Record the first fault and tell every worker to stop.
    fn fail(&self, error: EngineError) {
        let mut fault = lock(&self.fault);
        if fault.is_none() {
            *fault = Some(error);
        }
        self.abort.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Worker body: drain the queue until it is empty or the run aborts.
    fn run_worker(&self) {
        let _finished = FinishGuard(&self.finished_workers);

        loop {
            if self.abort.load(Ordering::SeqCst) {
                break;
            }
            if self.is_shutdown_requested() {
                log::debug!("Hashing: Shutdown requested, worker stopping");
                self.fail(EngineError::Interrupted);
                break;
            }

            let Some((index, record)) = lock(&self.queue).pop_front() else {
                break;
            };

            let path = record.path.clone();
            match panic::catch_unwind(AssertUnwindSafe(|| self.process(index, record))) {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    log::error!("Failed to fingerprint {}: {}", path.display(), source);
                    self.fail(EngineError::Worker { path, source });
                    break;
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::error!("Worker panicked on {}: {}", path.display(), message);
                    self.fail(EngineError::Panicked { path, message });
                    break;
                }
            }
        }
    }

    fn process(&self, index: usize, mut record: FileRecord) -> Result<(), FingerprintError> {
        // The hit decision, including the case-sibling check, runs under one lock.
        let cached = lock(&self.cache)
            .lookup(&record.path, record.modified)
            .map(|entry| entry.digest.clone());

        match cached {
            Some(digest) => {
                log::trace!("Cache hit: {}", record.path.display());
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                if digest.is_empty() {
                    record.mark_corrupt();
                    self.corrupt.fetch_add(1, Ordering::Relaxed);
                } else {
                    record.apply_digest(digest);
                }
            }
            None if is_hashable_image(&record.path) => {
                log::trace!("Cache miss: {}", record.path.display());
                let outcome = self.fingerprinter.fingerprint(&record.path)?;
                self.hashed.fetch_add(1, Ordering::Relaxed);
                match outcome {
                    Fingerprint::Digest(digest) => {
                        lock(&self.cache).upsert(&record.path, digest.clone(), record.modified);
                        record.apply_digest(digest);
                    }
                    Fingerprint::Corrupt => {
                        log::warn!("Corrupt image: {}", record.path.display());
                        lock(&self.cache).upsert(&record.path, String::new(), record.modified);
                        record.mark_corrupt();
                        self.corrupt.fetch_add(1, Ordering::Relaxed);
                    }
                    Fingerprint::NotAnImage => {}
                }
            }
            None => {}
        }

        lock(&self.results).push((index, record));
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stats(&self, files: usize) -> HashStats {
        HashStats {
            files,
            processed: self.processed.load(Ordering::SeqCst),
            hashed: self.hashed.load(Ordering::SeqCst),
            cache_hits: self.cache_hits.load(Ordering::SeqCst),
            corrupt: self.corrupt.load(Ordering::SeqCst),
        }
    }
}

/// Fingerprints walked records on a fixed-size worker pool.
pub struct HashingEngine {
    fingerprinter: Arc<dyn Fingerprinter>,
    config: EngineConfig,
}

impl std::fmt::Debug for HashingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingEngine")
            .field("fingerprinter", &"<fingerprinter>")
            .field("config", &self.config)
            .finish()
    }
}

impl HashingEngine {
    /// Create a new engine.
    #[must_use]
    pub fn new(fingerprinter: Arc<dyn Fingerprinter>, config: EngineConfig) -> Self {
        Self {
            fingerprinter,
            config,
        }
    }

    /// Fingerprint every record, consulting and updating `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`HashFailure`] when a worker hits an unreadable file, a worker
    /// panics, the pool cannot be built, or shutdown is requested. The failure
    /// carries the cache with every fingerprint computed so far.
    pub fn hash_all(
        &self,
        records: Vec<FileRecord>,
        cache: FingerprintCache,
    ) -> Result<HashRun, HashFailure> {
        let total = records.len();
        let workers = self.config.workers.max(1);

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hash-worker-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                return Err(HashFailure {
                    error: EngineError::Pool(e),
                    partial_cache: cache,
                })
            }
        };

        log::info!("Hashing {} files with {} workers", total, workers);
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("hashing", total);
        }

        let ctx = RunContext::new(
            records,
            cache,
            self.fingerprinter.as_ref(),
            self.config.shutdown_flag.as_deref(),
        );

        pool.in_place_scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| ctx.run_worker());
            }
            self.poll_until_done(&ctx, workers);
        });

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("hashing");
        }

        let stats = ctx.stats(total);
        let RunContext {
            cache,
            results,
            fault,
            ..
        } = ctx;
        let cache = cache.into_inner().unwrap_or_else(PoisonError::into_inner);

        if let Some(error) = fault.into_inner().unwrap_or_else(PoisonError::into_inner) {
            log::warn!(
                "Hashing stopped after {}/{} files: {}",
                stats.processed,
                total,
                error
            );
            return Err(HashFailure {
                error,
                partial_cache: cache,
            });
        }

        let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        results.sort_unstable_by_key(|(index, _)| *index);
        let records: Vec<FileRecord> = results.into_iter().map(|(_, record)| record).collect();

        log::info!(
            "Hashing complete: {} files, {} fingerprinted, {} cache hits, {} corrupt",
            stats.files,
            stats.hashed,
            stats.cache_hits,
            stats.corrupt
        );

        Ok(HashRun {
            records,
            cache,
            stats,
        })
    }

    /// Block the calling thread until every worker has exited, reporting
    /// progress at the configured interval.
    fn poll_until_done(&self, ctx: &RunContext<'_>, workers: usize) {
        let mut last_reported = usize::MAX;
        loop {
            let done = ctx.finished_workers.load(Ordering::SeqCst) >= workers;
            let processed = ctx.processed.load(Ordering::SeqCst);

            if processed != last_reported {
                if let Some(ref callback) = self.config.progress_callback {
                    callback.on_progress(processed, "");
                }
                last_reported = processed;
            }

            if done {
                break;
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }
}
