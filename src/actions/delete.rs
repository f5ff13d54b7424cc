//! Permanent file and directory deletion.
//!
//! # Overview
//!
//! This module provides the deletion primitives used by the duplicate and
//! orphan passes:
//! - Permanent deletion of a single file
//! - Recursive removal of an orphaned directory
//! - Batch operations over walked records
//! - TOCTOU verification before deletion
//!
//! # Safety
//!
//! Records are checked against a [`FileSnapshot`] taken from the walk before
//! they are removed: a file whose size or modification time changed since it
//! was indexed is left alone and reported as [`DeleteError::Modified`].
//!
//! # Example
//!
//! ```no_run
//! use photosweep::actions::delete::permanent_delete;
//! use std::path::PathBuf;
//!
//! let path = PathBuf::from("/photos/copy of IMG_0001.JPG");
//! match permanent_delete(&path) {
//!     Ok(result) => println!("Deleted: {}", result.path.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use thiserror::Error;
use walkdir::WalkDir;

use crate::scanner::FileRecord;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since it was indexed (TOCTOU protection).
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// The delete call itself failed.
    #[error("delete failed for {path}: {source}")]
    DeleteFailed {
        /// Path being deleted
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::DeleteFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }

    fn from_metadata(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Result of a successful deletion operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Bytes freed (sum of file sizes for a directory).
    pub size: u64,
    /// Whether a whole directory was removed.
    pub directory: bool,
}

impl DeleteResult {
    /// Create a new delete result.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, directory: bool) -> Self {
        Self {
            path,
            size,
            directory,
        }
    }
}

/// Results of a batch deletion operation.
#[derive(Debug, Default)]
pub struct BatchDeleteResult {
    /// Successfully deleted entries.
    pub successes: Vec<DeleteResult>,
    /// Failed deletions.
    pub failures: Vec<DeleteError>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record the outcome of one deletion.
    pub fn push(&mut self, outcome: Result<DeleteResult, DeleteError>) {
        match outcome {
            Ok(result) => {
                self.bytes_freed += result.size;
                self.successes.push(result);
            }
            Err(e) => {
                log::warn!("{}", e);
                self.failures.push(e);
            }
        }
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Deleted {} item(s), freed {}",
                self.success_count(),
                ByteSize::b(self.bytes_freed)
            )
        } else {
            format!(
                "Deleted {} item(s), {} failed, freed {}",
                self.success_count(),
                self.failure_count(),
                ByteSize::b(self.bytes_freed)
            )
        }
    }
}

/// File metadata snapshot for TOCTOU verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

impl FileSnapshot {
    /// Snapshot of a record as it was indexed.
    #[must_use]
    pub fn of_record(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            modified: record.modified,
        }
    }

    /// Create a snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, DeleteError> {
        let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata(path, e))?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| DeleteError::from_metadata(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified,
        })
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if file was modified, deleted, or can't be accessed.
    pub fn verify(&self) -> Result<(), DeleteError> {
        let current = Self::capture(&self.path)?;

        if self.modified != current.modified {
            log::warn!(
                "File modified since scan: {} (mtime changed)",
                self.path.display()
            );
            return Err(DeleteError::Modified(self.path.clone()));
        }

        if self.size != current.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(DeleteError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Permanently delete a single file.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if the file cannot be inspected
/// - `DeleteFailed` if the delete operation fails
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata(path, e))?;
    let size = metadata.len();

    fs::remove_file(path).map_err(|source| {
        log::error!("Permanent delete failed for {}: {}", path.display(), source);
        DeleteError::DeleteFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);

    Ok(DeleteResult::new(path.to_path_buf(), size, false))
}

/// Delete an indexed record after checking it has not changed since the walk.
///
/// # Errors
///
/// - `Modified` if the file changed since it was indexed
/// - Other errors from [`permanent_delete`]
pub fn delete_verified(record: &FileRecord) -> Result<DeleteResult, DeleteError> {
    FileSnapshot::of_record(record).verify()?;
    permanent_delete(&record.path)
}

/// Recursively remove a directory and everything under it.
///
/// # Errors
///
/// - `NotFound` if the directory doesn't exist
/// - `DeleteFailed` if the removal fails part way
pub fn remove_directory(path: &Path) -> Result<DeleteResult, DeleteError> {
    fs::symlink_metadata(path).map_err(|e| DeleteError::from_metadata(path, e))?;

    let size: u64 = WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum();

    fs::remove_dir_all(path).map_err(|source| {
        log::error!("Directory removal failed for {}: {}", path.display(), source);
        DeleteError::DeleteFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    log::info!("Removed directory: {} ({} bytes)", path.display(), size);

    Ok(DeleteResult::new(path.to_path_buf(), size, true))
}

/// Delete a batch of indexed records, continuing past failures.
#[must_use]
pub fn delete_records<'a, I>(records: I) -> BatchDeleteResult
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let mut result = BatchDeleteResult::default();
    for record in records {
        result.push(delete_verified(record));
    }
    log::info!("{}", result.summary());
    result
}
