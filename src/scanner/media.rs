//! Media extension classification.
//!
//! Extensions are split into two families: hashable images, which drive the
//! fingerprinting path, and other media (video, thumbnails, layered images)
//! which count as legitimate media for delete/copy decisions but are never
//! pixel-hashed.

use std::path::Path;

/// Image extensions the fingerprinter decodes.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff", "png", "bmp"];

/// Media extensions that are recognized but never decoded.
/// `thm` is the camera JPEG thumbnail sidecar.
pub const OTHER_MEDIA_EXTENSIONS: &[&str] = &["avi", "mpg", "thm", "psd", "3gp", "mp4", "mov"];

/// Classification of a file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Decodable image; fingerprinted by pixel content.
    Image,
    /// Recognized media that is not pixel-hashed.
    OtherMedia,
    /// Anything else.
    Unrecognized,
}

impl MediaKind {
    /// Classify a path by its (case-insensitive) extension.
    #[must_use]
    pub fn of(path: &Path) -> Self {
        let Some(ext) = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
        else {
            return Self::Unrecognized;
        };

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else if OTHER_MEDIA_EXTENSIONS.contains(&ext.as_str()) {
            Self::OtherMedia
        } else {
            Self::Unrecognized
        }
    }
}

/// True if the file should go through the fingerprinter.
#[must_use]
pub fn is_hashable_image(path: &Path) -> bool {
    MediaKind::of(path) == MediaKind::Image
}

/// True for any recognized media file, hashable or not.
#[must_use]
pub fn is_media_file(path: &Path) -> bool {
    MediaKind::of(path) != MediaKind::Unrecognized
}
