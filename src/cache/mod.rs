//! Fingerprint caching module for photosweep.
//!
//! This module provides persistent storage for content fingerprints so that
//! repeated runs over the same tree skip files that have not changed.
//!
//! # Architecture
//!
//! The caching system is split into two components:
//!
//! * [`sidecar`]: The in-memory cache and its on-disk JSON sidecar
//!   (`FileHashes.json` at the top of each root).
//! * [`entry`]: The record stored per file and its validity rule.
//!
//! # Cache Invalidation
//!
//! An entry is a hit only when its stored modification time equals the
//! file's current modification time exactly. Any other difference (older or
//! newer) forces a fresh fingerprint. Paths are matched case-insensitively
//! through [`crate::scanner::PathKey`]. On a case-sensitive filesystem two
//! files can share a key (`IMG.png` and `img.png`); an entry whose stored
//! spelling still names another file on disk is never a hit for its sibling.
//!
//! Entries for files that failed to decode carry an empty digest, so a
//! corrupt file is not re-decoded on every run.

pub mod entry;
pub mod sidecar;

pub use entry::CacheEntry;
pub use sidecar::{CacheError, CacheResult, FingerprintCache, SIDECAR_VERSION};
