//! photosweep - duplicate finder and backup reconciler for photo collections
//!
//! Fingerprints images by their decoded pixels (BLAKE3) on a worker pool,
//! caches fingerprints per tree so unchanged files are never decoded twice,
//! and reconciles a source tree against a backup destination.

pub mod actions;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod reconcile;
pub mod scanner;
pub mod signal;

pub use app::{run_app, run_app_with_output};
