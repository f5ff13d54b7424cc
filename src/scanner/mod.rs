//! Scanner module for directory traversal and content fingerprinting.
//!
//! This module provides functionality for:
//! - Sequential directory walking with fixed ignore rules
//! - Duplicate protection via a per-directory marker file
//! - Pixel-level content fingerprints for recognized image types
//! - Case-insensitive, Unicode-normalized path keys
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`fingerprint`]: Decoded-pixel fingerprints (BLAKE3)
//! - [`media`]: Extension classification
//! - [`path_utils`]: Path normalization and [`PathKey`]
//!
//! # Example
//!
//! ```no_run
//! use photosweep::scanner::Walker;
//! use std::path::Path;
//!
//! let output = Walker::new(Path::new("/photos")).walk().unwrap();
//! for record in &output.records {
//!     println!("{}: {} bytes (key {})", record.path.display(), record.size, record.key);
//! }
//! for err in &output.errors {
//!     eprintln!("Warning: {}", err);
//! }
//! ```

pub mod fingerprint;
pub mod media;
pub mod path_utils;
pub mod walker;

use std::borrow::Cow;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

// Re-export main types
pub use fingerprint::{Fingerprint, FingerprintError, Fingerprinter, PixelFingerprinter};
pub use media::{is_hashable_image, is_media_file, MediaKind};
pub use path_utils::PathKey;
pub use walker::{WalkOutput, Walker};

/// Name of the per-root fingerprint cache sidecar. Matched case-sensitively.
pub const CACHE_FILE_NAME: &str = "FileHashes.json";

/// Staging file used while the sidecar is being rewritten.
pub const CACHE_TEMP_FILE_NAME: &str = "FileHashes.json.tmp";

/// Files with this extension (case-sensitive, no dot) are never indexed.
pub const SKIPPED_EXTENSION: &str = "db";

/// Directory name used by the sync client for partial downloads.
/// Skipped together with its whole subtree.
pub const PARTIAL_DOWNLOAD_DIR: &str = ".dropbox.cache";

/// Marker file that protects a directory and its descendants from
/// duplicate flagging and deletion.
pub const PROTECT_MARKER: &str = ".ignoreduplicates";

/// Desktop metadata file that is never copied between trees.
pub const DESKTOP_METADATA_FILE: &str = "desktop.ini";

/// File names that are excluded from copy operations regardless of match status.
pub const COPY_EXCLUDED_NAMES: &[&str] = &[DESKTOP_METADATA_FILE, CACHE_FILE_NAME];

/// Returns true for the cache sidecar and its staging file.
#[must_use]
pub fn is_cache_file(name: &str) -> bool {
    name == CACHE_FILE_NAME || name == CACHE_TEMP_FILE_NAME
}

/// One file discovered during a tree walk.
///
/// Created by the walker with a `name:length` key, then updated exactly once
/// by the hashing engine when a digest becomes available.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time as reported by the filesystem
    pub modified: DateTime<Utc>,
    /// Hex digest of the decoded pixel content, once known
    pub digest: Option<String>,
    /// De-duplication key: the digest if known, else `name:length`
    pub key: String,
    /// The file claimed to be an image but could not be decoded
    pub corrupt: bool,
    /// The file lives under a directory carrying [`PROTECT_MARKER`]
    pub protected: bool,
}

impl FileRecord {
    /// Create a new record keyed by name and size.
    ///
    /// # Arguments
    ///
    /// * `path` - Absolute path to the file
    /// * `size` - File size in bytes
    /// * `modified` - Last modification time
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: DateTime<Utc>) -> Self {
        let key = name_key(&file_name_of(&path), size);
        Self {
            path,
            size,
            modified,
            digest: None,
            key,
            corrupt: false,
            protected: false,
        }
    }

    /// Mark the record as protected.
    #[must_use]
    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    /// Final path component, lossily converted.
    #[must_use]
    pub fn file_name(&self) -> Cow<'_, str> {
        file_name_of(&self.path)
    }

    /// Install a content digest; the digest becomes the de-duplication key.
    pub fn apply_digest(&mut self, digest: String) {
        self.key.clone_from(&digest);
        self.digest = Some(digest);
    }

    /// Flag the record as an undecodable image. The digest stays empty.
    pub fn mark_corrupt(&mut self) {
        self.corrupt = true;
        self.digest = None;
    }
}

/// Fallback de-duplication key used until a digest is known.
#[must_use]
pub fn name_key(name: &str, size: u64) -> String {
    format!("{name}:{size}")
}

fn file_name_of(path: &std::path::Path) -> Cow<'_, str> {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or(Cow::Borrowed(""))
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for the given path.
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::Io { path, source },
        }
    }
}
