//! Planning the copy and orphan passes between a source and a destination.
//!
//! Both planners only inspect the filesystem; executing a plan is up to the
//! caller (see [`crate::actions`]).

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::duplicates::FirstSeen;
use crate::scanner::path_utils::mirror_path;
use crate::scanner::{
    is_cache_file, is_media_file, FileRecord, ScanError, COPY_EXCLUDED_NAMES, PARTIAL_DOWNLOAD_DIR,
    PROTECT_MARKER,
};

/// Directories with more orphan files than this are summarised in reports.
pub const ORPHAN_SUMMARY_THRESHOLD: usize = 5;

/// Why a source file needs copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// Nothing exists at the mirrored destination path.
    Absent,
    /// A file exists there with a different length.
    SizeDiffers {
        /// Length of the existing destination file
        dest_size: u64,
    },
}

/// One planned copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyCandidate {
    /// Source record
    pub source: FileRecord,
    /// Mirrored destination path
    pub dest: PathBuf,
    /// Why it is planned
    pub reason: CopyReason,
    /// Not a recognized media file; copied, but reported with a warning
    pub nonstandard: bool,
}

/// Plan copies of every source occupant whose mirrored destination path is
/// absent or has a different length.
#[must_use]
pub fn plan_copies(source_root: &Path, dest_root: &Path, source: &FirstSeen) -> Vec<CopyCandidate> {
    let mut plan = Vec::new();

    for record in source {
        if COPY_EXCLUDED_NAMES.contains(&&*record.file_name()) {
            log::trace!("Never copied: {}", record.path.display());
            continue;
        }
        let Some(dest) = mirror_path(&record.path, source_root, dest_root) else {
            log::warn!(
                "{} is not under {}, not copying",
                record.path.display(),
                source_root.display()
            );
            continue;
        };

        let reason = match fs::metadata(&dest) {
            Ok(meta) if meta.is_file() && meta.len() == record.size => continue,
            Ok(meta) => CopyReason::SizeDiffers {
                dest_size: meta.len(),
            },
            Err(_) => CopyReason::Absent,
        };

        plan.push(CopyCandidate {
            nonstandard: !is_media_file(&record.path),
            source: record.clone(),
            dest,
            reason,
        });
    }

    log::info!("Copy plan: {} file(s)", plan.len());
    plan
}

/// Destination entries with no source counterpart.
#[derive(Debug, Default)]
pub struct OrphanPlan {
    /// Orphan files, grouped by directory in walk order
    pub files: Vec<PathBuf>,
    /// Orphan directories, removed wholesale
    pub directories: Vec<PathBuf>,
    /// Subtrees that could not be read
    pub errors: Vec<ScanError>,
}

impl OrphanPlan {
    /// Whether nothing is planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Orphan files grouped by parent directory, in walk order.
    #[must_use]
    pub fn files_by_directory(&self) -> Vec<(&Path, Vec<&Path>)> {
        let mut groups: Vec<(&Path, Vec<&Path>)> = Vec::new();
        for file in &self.files {
            let parent = file.parent().unwrap_or_else(|| Path::new(""));
            match groups.last_mut() {
                Some((dir, members)) if *dir == parent => members.push(file.as_path()),
                _ => groups.push((parent, vec![file.as_path()])),
            }
        }
        groups
    }
}

fn contains_marker(dir: &Path) -> bool {
    dir.join(PROTECT_MARKER).is_file()
}

fn subtree_contains_marker(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| e.file_type().is_file() && e.file_name() == PROTECT_MARKER)
}

/// Plan deletion of destination files and directories that no longer exist
/// in the source.
#[must_use]
pub fn plan_orphans(source_root: &Path, dest_root: &Path) -> OrphanPlan {
    let mut plan = OrphanPlan::default();
    if contains_marker(dest_root) {
        log::info!("{} is protected, no orphans planned", dest_root.display());
        return plan;
    }
    visit(source_root, dest_root, &mut plan);
    log::info!(
        "Orphan plan: {} file(s), {} directory(ies)",
        plan.files.len(),
        plan.directories.len()
    );
    plan
}

/// Plan one destination directory whose source mirror is `source_dir`.
fn visit(source_dir: &Path, dest_dir: &Path, plan: &mut OrphanPlan) {
    let entries = match fs::read_dir(dest_dir) {
        Ok(entries) => entries,
        Err(e) => {
            let err = ScanError::from_io(dest_dir.to_path_buf(), e);
            log::warn!("Skipping {}: {}", dest_dir.display(), err);
            plan.errors.push(err);
            return;
        }
    };

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => dirs.push(entry.file_name()),
            Ok(ft) if ft.is_file() => files.push(entry.file_name()),
            _ => {}
        }
    }
    files.sort();
    dirs.sort();

    for name in files {
        if is_cache_file(&name.to_string_lossy()) {
            continue;
        }
        if !source_dir.join(&name).exists() {
            plan.files.push(dest_dir.join(&name));
        }
    }

    for name in dirs {
        if name == PARTIAL_DOWNLOAD_DIR {
            continue;
        }
        let dest_sub = dest_dir.join(&name);
        if contains_marker(&dest_sub) {
            log::debug!("Protected, not planned: {}", dest_sub.display());
            continue;
        }
        let source_sub = source_dir.join(&name);
        if source_sub.is_dir() || subtree_contains_marker(&dest_sub) {
            visit(&source_sub, &dest_sub, plan);
        } else {
            plan.directories.push(dest_sub);
        }
    }
}
