//! Duplicate detection over hashed records.
//!
//! [`detect`] is a sequential reducer: it walks the records in the order
//! given (walk order, source after source) and decides for each one whether
//! it is the first occupant of its key, a duplicate of an earlier occupant,
//! or corrupt. The result only depends on input order.

use std::collections::HashMap;

use crate::scanner::FileRecord;

/// Insertion-ordered map from de-duplication key to the first record seen
/// with that key.
#[derive(Debug, Clone, Default)]
pub struct FirstSeen {
    records: Vec<FileRecord>,
    index: HashMap<String, usize>,
}

impl FirstSeen {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupant of `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FileRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Whether `key` is occupied.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Occupy the record's key if it is free. Returns false if it was taken.
    pub fn insert(&mut self, record: FileRecord) -> bool {
        if self.index.contains_key(&record.key) {
            return false;
        }
        self.index.insert(record.key.clone(), self.records.len());
        self.records.push(record);
        true
    }

    /// Occupants in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    /// Number of occupied keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no key is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a FirstSeen {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<FileRecord> for FirstSeen {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut map = Self::new();
        for record in iter {
            map.insert(record);
        }
        map
    }
}

/// Outcome of [`detect`].
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// First non-corrupt record per key
    pub first_seen: FirstSeen,
    /// Later records whose key was already occupied, in input order
    pub duplicates: Vec<FileRecord>,
    /// Records that failed to decode
    pub corrupt: Vec<FileRecord>,
    /// Pairings dropped because one side was protected
    pub protected_skips: usize,
}

impl Detection {
    /// Bytes that deleting every duplicate would free.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.duplicates.iter().map(|r| r.size).sum()
    }

    /// The occupant a duplicate collided with.
    #[must_use]
    pub fn original_of(&self, duplicate: &FileRecord) -> Option<&FileRecord> {
        self.first_seen.get(&duplicate.key)
    }
}

/// Reduce hashed records into first-seen occupants, duplicates, and corrupt files.
///
/// - Corrupt records go to [`Detection::corrupt`] and never occupy a key.
/// - A record whose key is free occupies it.
/// - A record whose key is taken becomes a duplicate, unless it or the
///   occupant is protected, in which case it is dropped.
#[must_use]
pub fn detect<I>(records: I) -> Detection
where
    I: IntoIterator<Item = FileRecord>,
{
    let mut detection = Detection::default();

    for record in records {
        if record.corrupt {
            detection.corrupt.push(record);
            continue;
        }

        match detection.first_seen.get(&record.key) {
            Some(occupant) if occupant.protected || record.protected => {
                log::trace!(
                    "Protected pairing skipped: {} / {}",
                    occupant.path.display(),
                    record.path.display()
                );
                detection.protected_skips += 1;
            }
            Some(occupant) => {
                log::debug!(
                    "Duplicate: {} matches {}",
                    record.path.display(),
                    occupant.path.display()
                );
                detection.duplicates.push(record);
            }
            None => {
                detection.first_seen.insert(record);
            }
        }
    }

    log::info!(
        "Detection: {} unique, {} duplicates, {} corrupt",
        detection.first_seen.len(),
        detection.duplicates.len(),
        detection.corrupt.len()
    );

    detection
}
