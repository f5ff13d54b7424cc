//! Explaining destination-only files.
//!
//! A destination file whose key is not present in the source may still have
//! a counterpart there: the same bytes under another name, or the same name
//! with a slightly different size (re-saved, re-tagged). The matcher tries,
//! in order:
//!
//! 1. **Exact content**: every source file of the same byte length is
//!    compared byte for byte; the first equal one in source order wins.
//! 2. **Name**: among source files with the same file name, the one with the
//!    smallest relative size difference wins (ties go to the earlier one).
//!
//! A file counts as found elsewhere on an exact-content match or when the
//! name match is within [`FOUND_ELSEWHERE_THRESHOLD`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::duplicates::FirstSeen;
use crate::scanner::FileRecord;

/// Below this relative size difference a name match is [`MatchKind::NameAndSize`].
pub const NEAR_SIZE_THRESHOLD: f64 = 0.01;

/// Below this relative size difference a name match explains the file.
pub const FOUND_ELSEWHERE_THRESHOLD: f64 = 0.03;

const COMPARE_CHUNK: usize = 64 * 1024;

/// How a destination file relates to the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Byte-identical file under a different name or path.
    ExactContent,
    /// Same file name, size within 1%.
    NameAndSize,
    /// Same file name, larger size difference.
    NameOnly,
    /// No candidate at all.
    None,
}

/// Best match for one destination file.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Match tier
    pub kind: MatchKind,
    /// Source record that matched, if any
    pub candidate: Option<FileRecord>,
    /// `|dest size - source size| / dest size`; 0 for exact content
    pub size_delta_ratio: f64,
}

impl MatchResult {
    fn none() -> Self {
        Self {
            kind: MatchKind::None,
            candidate: None,
            size_delta_ratio: f64::INFINITY,
        }
    }

    /// Whether the destination file is accounted for by the source.
    #[must_use]
    pub fn is_found_elsewhere(&self) -> bool {
        self.kind == MatchKind::ExactContent || self.size_delta_ratio < FOUND_ELSEWHERE_THRESHOLD
    }
}

/// Destination-only file together with its best source match.
#[derive(Debug, Clone, PartialEq)]
pub struct Explained {
    /// Destination record
    pub dest: FileRecord,
    /// Best source match
    pub matched: MatchResult,
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Destination-only files the source accounts for
    pub found_elsewhere: Vec<Explained>,
    /// Destination-only files with no adequate source match
    pub missing: Vec<Explained>,
}

/// Relative size difference measured against the destination size.
#[must_use]
pub fn size_delta_ratio(dest_size: u64, source_size: u64) -> f64 {
    if dest_size == 0 {
        return if source_size == 0 { 0.0 } else { f64::INFINITY };
    }
    dest_size.abs_diff(source_size) as f64 / dest_size as f64
}

/// Compare two files byte for byte. Lengths are assumed equal already.
///
/// # Errors
///
/// Returns an I/O error if either file cannot be opened or read.
pub fn files_equal(a: &Path, b: &Path) -> io::Result<bool> {
    let mut ra = BufReader::with_capacity(COMPARE_CHUNK, File::open(a)?);
    let mut rb = BufReader::with_capacity(COMPARE_CHUNK, File::open(b)?);
    let mut buf_a = vec![0u8; COMPARE_CHUNK];
    let mut buf_b = vec![0u8; COMPARE_CHUNK];

    loop {
        let n = read_full(&mut ra, &mut buf_a)?;
        let m = read_full(&mut rb, &mut buf_b)?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the reader allows.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Source occupants indexed by byte length and by file name, in source order.
#[derive(Debug)]
pub struct SourceIndex<'a> {
    by_size: HashMap<u64, Vec<&'a FileRecord>>,
    by_name: HashMap<String, Vec<&'a FileRecord>>,
}

impl<'a> SourceIndex<'a> {
    /// Index every occupant of `source`.
    #[must_use]
    pub fn new(source: &'a FirstSeen) -> Self {
        let mut by_size: HashMap<u64, Vec<&FileRecord>> = HashMap::new();
        let mut by_name: HashMap<String, Vec<&FileRecord>> = HashMap::new();
        for record in source {
            by_size.entry(record.size).or_default().push(record);
            by_name
                .entry(record.file_name().into_owned())
                .or_default()
                .push(record);
        }
        Self { by_size, by_name }
    }

    /// Find the best source match for a destination record.
    #[must_use]
    pub fn best_match(&self, dest: &FileRecord) -> MatchResult {
        if let Some(candidate) = self.exact_content(dest) {
            return MatchResult {
                kind: MatchKind::ExactContent,
                candidate: Some(candidate.clone()),
                size_delta_ratio: 0.0,
            };
        }
        self.by_file_name(dest)
    }

    fn exact_content(&self, dest: &FileRecord) -> Option<&'a FileRecord> {
        let same_size = self.by_size.get(&dest.size)?;
        same_size.iter().copied().find(|candidate| {
            match files_equal(&dest.path, &candidate.path) {
                Ok(equal) => equal,
                Err(e) => {
                    log::warn!(
                        "Could not compare {} with {}: {}",
                        dest.path.display(),
                        candidate.path.display(),
                        e
                    );
                    false
                }
            }
        })
    }

    fn by_file_name(&self, dest: &FileRecord) -> MatchResult {
        let Some(same_name) = self.by_name.get(&*dest.file_name()) else {
            return MatchResult::none();
        };

        let mut best: Option<(&FileRecord, f64)> = None;
        for &candidate in same_name {
            let ratio = size_delta_ratio(dest.size, candidate.size);
            // Strict comparison keeps the earlier candidate on ties.
            if best.map_or(true, |(_, r)| ratio < r) {
                best = Some((candidate, ratio));
            }
        }

        match best {
            Some((candidate, ratio)) => MatchResult {
                kind: if ratio < NEAR_SIZE_THRESHOLD {
                    MatchKind::NameAndSize
                } else {
                    MatchKind::NameOnly
                },
                candidate: Some(candidate.clone()),
                size_delta_ratio: ratio,
            },
            None => MatchResult::none(),
        }
    }
}

/// Classify every destination key that the source does not have.
///
/// Never touches the filesystem beyond reading files for comparison.
#[must_use]
pub fn reconcile(source: &FirstSeen, dest: &FirstSeen) -> Reconciliation {
    let index = SourceIndex::new(source);
    let mut result = Reconciliation::default();

    for record in dest.iter().filter(|r| !source.contains_key(&r.key)) {
        let matched = index.best_match(record);
        log::debug!(
            "{}: {:?} (ratio {:.4})",
            record.path.display(),
            matched.kind,
            matched.size_delta_ratio
        );
        let explained = Explained {
            dest: record.clone(),
            matched,
        };
        if explained.matched.is_found_elsewhere() {
            result.found_elsewhere.push(explained);
        } else {
            result.missing.push(explained);
        }
    }

    log::info!(
        "Reconciliation: {} found elsewhere, {} missing",
        result.found_elsewhere.len(),
        result.missing.len()
    );

    result
}
