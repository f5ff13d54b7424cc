//! Sequential directory walker.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a source or
//! destination tree and collecting [`FileRecord`]s. The walk is depth-first
//! and single-threaded; within each directory files are yielded before
//! subdirectories, both sorted by name, so progress output is reproducible.
//!
//! # Fixed rules
//!
//! - The cache sidecar ([`CACHE_FILE_NAME`]) is never indexed
//! - Files with the [`SKIPPED_EXTENSION`] extension are never indexed
//! - Directories named [`PARTIAL_DOWNLOAD_DIR`] are skipped with their subtree
//! - A directory containing [`PROTECT_MARKER`] protects itself and all
//!   descendants
//!
//! Permission errors are collected and the affected subtree is skipped; the
//! walk carries on with the siblings.
//!
//! # Example
//!
//! ```no_run
//! use photosweep::scanner::Walker;
//! use std::path::Path;
//!
//! let output = Walker::new(Path::new("/home/user/Pictures")).walk().unwrap();
//! println!("Found {} files", output.records.len());
//! ```

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use walkdir::{DirEntry, WalkDir};

use super::{
    is_cache_file, FileRecord, ScanError, PARTIAL_DOWNLOAD_DIR, PROTECT_MARKER, SKIPPED_EXTENSION,
};
use crate::progress::ProgressCallback;

/// Result of walking one tree.
#[derive(Debug, Default)]
pub struct WalkOutput {
    /// Discovered files in walk order
    pub records: Vec<FileRecord>,
    /// Recoverable errors (skipped subtrees, unreadable entries)
    pub errors: Vec<ScanError>,
    /// Whether the walk stopped early because shutdown was requested
    pub interrupted: bool,
}

impl WalkOutput {
    /// Number of records stamped as protected.
    #[must_use]
    pub fn protected_count(&self) -> usize {
        self.records.iter().filter(|r| r.protected).count()
    }
}

/// Directory walker for sequential file discovery.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Protection inherited from outside the root
    protected: bool,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("protected", &self.protected)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            protected: false,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Treat the root as already protected (inherited from an ancestor).
    #[must_use]
    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
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

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the tree.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the root itself is missing or not a directory.
    /// Errors below the root are collected in [`WalkOutput::errors`].
    pub fn walk(&self) -> Result<WalkOutput, ScanError> {
        let root_meta = std::fs::metadata(&self.root)
            .map_err(|e| ScanError::from_io(self.root.clone(), e))?;
        if !root_meta.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let mut output = WalkOutput::default();
        // Depths of directories on the current branch that carry the marker.
        let mut protected_depths: Vec<usize> = Vec::new();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("walking", 0);
        }

        let walk = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by(|a, b| {
                let a_dir = a.file_type().is_dir();
                let b_dir = b.file_type().is_dir();
                a_dir
                    .cmp(&b_dir)
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == PARTIAL_DOWNLOAD_DIR));

        for entry in walk {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping walk");
                output.interrupted = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    output.errors.push(self.handle_walk_error(e));
                    continue;
                }
            };

            let depth = entry.depth();
            while protected_depths.last().is_some_and(|&d| d >= depth) {
                protected_depths.pop();
            }

            if entry.file_type().is_dir() {
                if entry.path().join(PROTECT_MARKER).is_file() {
                    log::debug!("Protected directory: {}", entry.path().display());
                    protected_depths.push(depth);
                }
                continue;
            }

            if !entry.file_type().is_file() {
                log::trace!("Skipping non-regular file: {}", entry.path().display());
                continue;
            }

            if self.should_skip_file(&entry) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    output.errors.push(self.handle_walk_error(e));
                    continue;
                }
            };

            let protected = self.protected || !protected_depths.is_empty();
            let record = Self::make_record(entry.into_path(), &metadata).with_protected(protected);
            output.records.push(record);

            if let Some(ref callback) = self.progress_callback {
                let last = output.records.len();
                callback.on_progress(last, &output.records[last - 1].path.to_string_lossy());
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("walking");
        }

        log::info!(
            "Walked {}: {} files ({} protected, {} errors)",
            self.root.display(),
            output.records.len(),
            output.protected_count(),
            output.errors.len()
        );

        Ok(output)
    }

    /// Apply the fixed file-level ignore rules.
    fn should_skip_file(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if is_cache_file(&name) {
            log::trace!("Skipping cache sidecar: {}", entry.path().display());
            return true;
        }
        if name == PROTECT_MARKER {
            return true;
        }
        let skipped_ext = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == SKIPPED_EXTENSION);
        if skipped_ext {
            log::trace!("Skipping database file: {}", entry.path().display());
        }
        skipped_ext
    }

    fn make_record(path: PathBuf, metadata: &Metadata) -> FileRecord {
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        FileRecord::new(path, metadata.len(), modified)
    }

    /// Convert a walkdir error, logging it.
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        match error.into_io_error() {
            Some(io) => {
                let err = ScanError::from_io(path, io);
                match err {
                    ScanError::PermissionDenied(ref p) => {
                        log::warn!("Permission denied, skipping: {}", p.display());
                    }
                    ScanError::NotFound(ref p) => {
                        log::debug!("Entry vanished during walk: {}", p.display());
                    }
                    ref other => log::warn!("{}", other),
                }
                err
            }
            None => {
                log::warn!("Walker error for {}: filesystem loop", path.display());
                ScanError::Io {
                    path,
                    source: std::io::Error::other("filesystem loop detected"),
                }
            }
        }
    }
}
