//! Per-root fingerprint cache backed by a JSON sidecar file.
//!
//! The sidecar is an envelope carrying a format version, a SHA-256 checksum
//! of the serialized record list, and the records themselves sorted by path.
//! It is written to a staging file first and renamed into place.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::entry::{is_storable, CacheEntry};
use crate::scanner::{PathKey, CACHE_FILE_NAME, CACHE_TEMP_FILE_NAME};

/// Current version of the sidecar format.
pub const SIDECAR_VERSION: u32 = 1;

/// Errors that can occur while loading or saving the cache sidecar.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the sidecar failed.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Sidecar path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The sidecar is not valid JSON of the expected shape.
    #[error("Failed to parse cache file {path}: {source}")]
    Parse {
        /// Sidecar path
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The record list does not match the stored checksum.
    #[error("Cache integrity check failed for {0}: checksum mismatch")]
    Checksum(PathBuf),

    /// The sidecar was written by an incompatible format version.
    #[error("Unsupported cache version {found} in {path} (expected {expected})")]
    Version {
        /// Sidecar path
        path: PathBuf,
        /// Version found on disk
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// Serializing the records failed.
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// On-disk layout of the sidecar.
#[derive(Debug, Serialize, Deserialize)]
struct SidecarEnvelope {
    /// Format version.
    version: u32,
    /// SHA-256 of the compact JSON serialization of `files`.
    checksum: String,
    /// Records sorted by path key.
    files: Vec<CacheEntry>,
}

fn checksum_of(files: &[CacheEntry]) -> CacheResult<String> {
    let json = serde_json::to_string(files).map_err(CacheError::Serialize)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// In-memory fingerprint cache for one root.
///
/// Loaded once at the start of a run, consulted and updated by the hashing
/// engine, and written back once at the end.
#[derive(Debug, Clone)]
pub struct FingerprintCache {
    sidecar: PathBuf,
    entries: HashMap<PathKey, CacheEntry>,
    loaded_len: usize,
    computed: usize,
}

impl FingerprintCache {
    /// Create an empty cache that will save to `sidecar`.
    #[must_use]
    pub fn empty(sidecar: PathBuf) -> Self {
        Self {
            sidecar,
            entries: HashMap::new(),
            loaded_len: 0,
            computed: 0,
        }
    }

    /// Sidecar location for a root directory.
    #[must_use]
    pub fn sidecar_path(root: &Path) -> PathBuf {
        root.join(CACHE_FILE_NAME)
    }

    /// Load the cache that lives at the top of `root`.
    ///
    /// # Errors
    ///
    /// See [`FingerprintCache::load`].
    pub fn for_root(root: &Path) -> CacheResult<Self> {
        Self::load(Self::sidecar_path(root))
    }

    /// Load a cache from a sidecar file. A missing file yields an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file exists but cannot be read, parsed,
    /// or verified.
    pub fn load(sidecar: PathBuf) -> CacheResult<Self> {
        let content = match fs::read_to_string(&sidecar) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No cache at {}, starting empty", sidecar.display());
                return Ok(Self::empty(sidecar));
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: sidecar,
                    source,
                })
            }
        };

        let envelope: SidecarEnvelope = match serde_json::from_str(&content) {
            Ok(envelope) => envelope,
            Err(source) => {
                return Err(CacheError::Parse {
                    path: sidecar,
                    source,
                })
            }
        };

        if envelope.version != SIDECAR_VERSION {
            return Err(CacheError::Version {
                path: sidecar,
                found: envelope.version,
                expected: SIDECAR_VERSION,
            });
        }

        if checksum_of(&envelope.files)? != envelope.checksum {
            return Err(CacheError::Checksum(sidecar));
        }

        let entries: HashMap<PathKey, CacheEntry> = envelope
            .files
            .into_iter()
            .map(|entry| (PathKey::new(&entry.path), entry))
            .collect();
        let loaded_len = entries.len();

        log::debug!(
            "Loaded {} cache entries from {}",
            loaded_len,
            sidecar.display()
        );

        Ok(Self {
            sidecar,
            entries,
            loaded_len,
            computed: 0,
        })
    }

    /// Look up a usable entry for `path` with the given modification time.
    ///
    /// An entry stored under a different spelling of the same key is only
    /// used when that spelling no longer names a file of its own.
    #[must_use]
    pub fn lookup(&self, path: &Path, modified: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries
            .get(&PathKey::new(path))
            .filter(|entry| entry.is_valid_for(modified))
            .filter(|entry| entry.path == path || !names_other_file(&entry.path, path))
    }

    /// Insert or replace the entry for `path` with a freshly computed result.
    ///
    /// An empty `digest` records a decode failure.
    pub fn upsert(&mut self, path: &Path, digest: String, modified: DateTime<Utc>) {
        self.entries.insert(
            PathKey::new(path),
            CacheEntry::new(path.to_path_buf(), digest, modified),
        );
        self.computed += 1;
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries computed (upserted) since load.
    #[must_use]
    pub fn computed(&self) -> usize {
        self.computed
    }

    /// Sidecar path this cache saves to.
    #[must_use]
    pub fn sidecar(&self) -> &Path {
        &self.sidecar
    }

    /// Whether saving would change anything on disk.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.computed > 0 || self.entries.len() != self.loaded_len
    }

    /// Write the cache back to its sidecar if anything changed.
    ///
    /// Returns `Ok(false)` when nothing was written.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the sidecar cannot be written.
    pub fn save(&self) -> CacheResult<bool> {
        if !self.is_dirty() {
            log::debug!("Cache unchanged, not rewriting {}", self.sidecar.display());
            return Ok(false);
        }

        let mut files: Vec<CacheEntry> = self
            .entries
            .values()
            .filter(|entry| {
                let storable = is_storable(&entry.path);
                if !storable {
                    log::warn!("Not caching unrepresentable path {}", entry.path.display());
                }
                storable
            })
            .cloned()
            .collect();
        files.sort_by_cached_key(|entry| PathKey::new(&entry.path));

        let envelope = SidecarEnvelope {
            version: SIDECAR_VERSION,
            checksum: checksum_of(&files)?,
            files,
        };
        let json = serde_json::to_string_pretty(&envelope).map_err(CacheError::Serialize)?;

        let staging = self.sidecar.with_file_name(CACHE_TEMP_FILE_NAME);
        let io_err = |source| CacheError::Io {
            path: staging.clone(),
            source,
        };
        let mut file = File::create(&staging).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&staging, &self.sidecar).map_err(|source| CacheError::Io {
            path: self.sidecar.clone(),
            source,
        })?;

        log::info!(
            "Saved {} cache entries ({} computed) to {}",
            self.entries.len(),
            self.computed,
            self.sidecar.display()
        );
        Ok(true)
    }
}

/// Whether `stored` still exists under exactly that spelling and is not the
/// file at `path`.
///
/// Checks the parent's directory listing, since a plain existence check
/// succeeds for any casing on a case-insensitive filesystem.
fn names_other_file(stored: &Path, path: &Path) -> bool {
    let (Some(parent), Some(name)) = (stored.parent(), stored.file_name()) else {
        return false;
    };
    let listed = match fs::read_dir(parent) {
        Ok(entries) => entries.flatten().any(|entry| entry.file_name() == name),
        Err(_) => false,
    };
    listed && !same_file(stored, path)
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

// Without inode numbers, a matching file name under a differently spelled
// directory is taken to be the same file.
#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    a.file_name() == b.file_name()
}
