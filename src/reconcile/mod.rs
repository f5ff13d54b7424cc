//! Cross-tree reconciliation between a source and a destination.
//!
//! This module provides functionality for:
//! - Explaining destination-only files by exact content or near-size name
//!   matches against the source ([`matcher`])
//! - Planning the copy pass (source files missing or resized in the
//!   destination) and the orphan pass (destination entries that no longer
//!   exist in the source) ([`plan`])
//!
//! Nothing here modifies the filesystem.

pub mod matcher;
pub mod plan;

pub use matcher::{
    files_equal, reconcile, size_delta_ratio, Explained, MatchKind, MatchResult, Reconciliation,
    SourceIndex, FOUND_ELSEWHERE_THRESHOLD, NEAR_SIZE_THRESHOLD,
};
pub use plan::{
    plan_copies, plan_orphans, CopyCandidate, CopyReason, OrphanPlan, ORPHAN_SUMMARY_THRESHOLD,
};
