//! Content fingerprints computed from decoded pixels.
//!
//! # Overview
//!
//! A fingerprint is a BLAKE3 digest of an image's decoded RGBA8 pixel buffer
//! (prefixed by its dimensions), not of the file's bytes. Re-encoding the
//! same picture to a different container or compression level therefore
//! yields the same fingerprint.
//!
//! The [`Fingerprinter`] trait is the seam the hashing engine consumes, so
//! tests can substitute counting or failing implementations.

use std::path::{Path, PathBuf};

use image::ImageError;
use thiserror::Error;

use super::media;

/// Outcome of fingerprinting a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// Lowercase hex digest of the decoded pixel content.
    Digest(String),
    /// The file is not a recognized image type.
    NotAnImage,
    /// The file claims to be an image but could not be decoded.
    Corrupt,
}

/// Unrecoverable failure while fingerprinting.
///
/// Decode failures are not errors; they are reported as [`Fingerprint::Corrupt`].
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The file could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File being fingerprinted
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Computes content fingerprints.
pub trait Fingerprinter: Send + Sync {
    /// Fingerprint the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError`] when the file cannot be read at all.
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError>;
}

/// Pixel-level fingerprinter backed by the `image` crate and BLAKE3.
#[derive(Debug, Default, Clone, Copy)]
pub struct PixelFingerprinter;

impl PixelFingerprinter {
    /// Create a new fingerprinter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Fingerprinter for PixelFingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        if !media::is_hashable_image(path) {
            return Ok(Fingerprint::NotAnImage);
        }

        let img = match image::open(path) {
            Ok(img) => img,
            Err(ImageError::IoError(source)) if !is_truncation(&source) => {
                return Err(FingerprintError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                log::debug!("Failed to decode {}: {}", path.display(), e);
                return Ok(Fingerprint::Corrupt);
            }
        };

        let rgba = img.to_rgba8();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&rgba.width().to_le_bytes());
        hasher.update(&rgba.height().to_le_bytes());
        hasher.update(rgba.as_raw());

        Ok(Fingerprint::Digest(hasher.finalize().to_hex().to_string()))
    }
}

/// Truncated or garbled image data surfaces as an I/O error from some
/// decoders; that is still a corrupt image, not an unreadable file.
fn is_truncation(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
    )
}
