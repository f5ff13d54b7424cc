//! Copying source files into the destination tree.
//!
//! Parent directories are created as needed and an existing destination
//! file is overwritten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use thiserror::Error;

/// Error type for copy operations.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The destination directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory being created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The copy itself failed.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        /// Source file
        from: PathBuf,
        /// Destination file
        to: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Result of a successful copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResult {
    /// Source file.
    pub from: PathBuf,
    /// Destination file.
    pub to: PathBuf,
    /// Bytes copied.
    pub bytes: u64,
}

/// Results of a batch copy.
#[derive(Debug, Default)]
pub struct BatchCopyResult {
    /// Successful copies.
    pub successes: Vec<CopyResult>,
    /// Failed copies.
    pub failures: Vec<CopyError>,
    /// Total bytes copied.
    pub bytes_copied: u64,
}

impl BatchCopyResult {
    /// Record the outcome of one copy.
    pub fn push(&mut self, outcome: Result<CopyResult, CopyError>) {
        match outcome {
            Ok(result) => {
                self.bytes_copied += result.bytes;
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
        if self.failures.is_empty() {
            format!(
                "Copied {} file(s), {}",
                self.successes.len(),
                ByteSize::b(self.bytes_copied)
            )
        } else {
            format!(
                "Copied {} file(s), {} failed, {}",
                self.successes.len(),
                self.failures.len(),
                ByteSize::b(self.bytes_copied)
            )
        }
    }
}

/// Copy `from` to `to`, creating parent directories and overwriting `to`.
///
/// # Errors
///
/// Returns [`CopyError`] if the parent directory cannot be created or the
/// copy fails.
pub fn copy_file(from: &Path, to: &Path) -> Result<CopyResult, CopyError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| CopyError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let bytes = fs::copy(from, to).map_err(|source| CopyError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;

    log::info!("Copied {} -> {} ({} bytes)", from.display(), to.display(), bytes);

    Ok(CopyResult {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        bytes,
    })
}
