//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Concurrent content fingerprinting with a persistent cache ([`engine`])
//! - First-seen duplicate reduction with protection rules ([`detector`])

pub mod detector;
pub mod engine;

pub use detector::{detect, Detection, FirstSeen};
pub use engine::{
    EngineConfig, EngineError, HashFailure, HashRun, HashStats, HashingEngine, DEFAULT_POLL_INTERVAL,
    DEFAULT_WORKERS,
};
