//! Cache entry definitions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single file entry in the fingerprint cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Path as first seen (original case)
    #[serde(with = "stored_path")]
    pub path: PathBuf,
    /// Hex digest of the decoded pixels; empty for a file that failed to decode
    pub digest: String,
    /// Modification time the digest was computed against
    pub last_modified: DateTime<Utc>,
}

impl CacheEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(path: PathBuf, digest: String, last_modified: DateTime<Utc>) -> Self {
        Self {
            path,
            digest,
            last_modified,
        }
    }

    /// Whether the entry can be used for a file with the given modification time.
    #[must_use]
    pub fn is_valid_for(&self, modified: DateTime<Utc>) -> bool {
        self.last_modified == modified
    }

    /// Whether the entry records a decode failure.
    #[must_use]
    pub fn is_corrupt_marker(&self) -> bool {
        self.digest.is_empty()
    }
}

/// Whether `path` can be written to the sidecar without loss.
///
/// Paths that are not valid UTF-8 are stored as raw bytes on Unix. Elsewhere
/// they cannot be represented and are left out of the sidecar.
#[must_use]
pub fn is_storable(path: &Path) -> bool {
    cfg!(unix) || path.to_str().is_some()
}

/// Serde adapter storing a path as a JSON string, or as an array of raw
/// bytes when the path is not valid UTF-8.
mod stored_path {
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Raw(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
        match path.to_str() {
            Some(text) => serializer.serialize_str(text),
            None => raw_bytes(path)
                .ok_or_else(|| {
                    <S::Error as serde::ser::Error>::custom(format!(
                        "path is not valid UTF-8: {}",
                        path.display()
                    ))
                })?
                .serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Ok(PathBuf::from(text)),
            Repr::Raw(bytes) => from_raw_bytes(bytes).ok_or_else(|| {
                serde::de::Error::custom("raw byte paths are only supported on Unix")
            }),
        }
    }

    #[cfg(unix)]
    fn raw_bytes(path: &Path) -> Option<&[u8]> {
        use std::os::unix::ffi::OsStrExt;
        Some(path.as_os_str().as_bytes())
    }

    #[cfg(not(unix))]
    fn raw_bytes(_path: &Path) -> Option<&[u8]> {
        None
    }

    #[cfg(unix)]
    fn from_raw_bytes(bytes: Vec<u8>) -> Option<PathBuf> {
        use std::os::unix::ffi::OsStringExt;
        Some(PathBuf::from(std::ffi::OsString::from_vec(bytes)))
    }

    #[cfg(not(unix))]
    fn from_raw_bytes(_bytes: Vec<u8>) -> Option<PathBuf> {
        None
    }
}
