//! Path keys and tree-to-tree path mapping.
//!
//! The fingerprint cache treats paths as case-insensitive identifiers. A plain
//! `to_lowercase()` is not enough on its own: macOS reports file names in NFD
//! (decomposed) form while Windows and Linux usually use NFC, so the same
//! visible name can arrive as different byte sequences.
//!
//! - NFC: `café.jpg` - 'é' is U+00E9 (single code point)
//! - NFD: `café.jpg` - 'e' U+0065 + combining acute accent U+0301
//!
//! [`PathKey`] normalizes to NFC first and then applies Unicode default case
//! folding via `to_lowercase`, which is locale-independent.
//!
//! # Example
//!
//! ```
//! use photosweep::scanner::PathKey;
//! use std::path::Path;
//!
//! let a = PathKey::new(Path::new("/Photos/Café.JPG"));
//! let b = PathKey::new(Path::new("/photos/cafe\u{0301}.jpg"));
//! assert_eq!(a, b);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Normalize a path string to NFC (Composed) form.
///
/// # Example
///
/// ```
/// use photosweep::scanner::path_utils::normalize_path_str;
///
/// let nfd = "cafe\u{0301}.jpg"; // NFD form
/// assert_eq!(normalize_path_str(nfd), "café.jpg");
/// ```
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Case-insensitive, normalization-insensitive identifier for a path.
///
/// Used as the key of the fingerprint cache. The original spelling of the
/// path is kept separately on the cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    /// Build the key for a path. Invalid UTF-8 is converted lossily.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self(normalize_path_str(&path.to_string_lossy()).to_lowercase())
    }

    /// The normalized key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Path> for PathKey {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map `path` under `from_root` to the same relative location under `to_root`.
///
/// Returns `None` when `path` is not inside `from_root`.
///
/// # Example
///
/// ```
/// use photosweep::scanner::path_utils::mirror_path;
/// use std::path::{Path, PathBuf};
///
/// let mirrored = mirror_path(
///     Path::new("/src/2019/img.jpg"),
///     Path::new("/src"),
///     Path::new("/backup"),
/// );
/// assert_eq!(mirrored, Some(PathBuf::from("/backup/2019/img.jpg")));
/// ```
#[must_use]
pub fn mirror_path(path: &Path, from_root: &Path, to_root: &Path) -> Option<PathBuf> {
    path.strip_prefix(from_root)
        .ok()
        .map(|relative| to_root.join(relative))
}
