//! File actions module.
//!
//! This module provides functionality for:
//! - Permanent deletion of duplicates and orphans
//! - Copying source files into the destination tree
//!
//! # Deletion
//!
//! The delete module provides permanent file deletion with:
//! - Recursive removal of orphaned directories
//! - Batch operations with a summary
//! - TOCTOU verification to detect files modified since they were indexed
//!
//! ```no_run
//! use photosweep::actions::delete::permanent_delete;
//! use std::path::PathBuf;
//!
//! let path = PathBuf::from("/backup/old/IMG_0001.JPG");
//! let result = permanent_delete(&path);
//! ```
//!
//! # Copy
//!
//! ```no_run
//! use photosweep::actions::copy::copy_file;
//! use std::path::Path;
//!
//! copy_file(Path::new("/photos/a.jpg"), Path::new("/backup/a.jpg")).unwrap();
//! ```

pub mod copy;
pub mod delete;

// Re-export commonly used types
pub use copy::{copy_file, BatchCopyResult, CopyError, CopyResult};
pub use delete::{
    delete_records, delete_verified, permanent_delete, remove_directory, BatchDeleteResult,
    DeleteError, DeleteResult, FileSnapshot,
};
