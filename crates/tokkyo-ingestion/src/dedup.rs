//! Duplicate detection within one batch.
//!
//! Two files describing the same publication would otherwise produce two
//! sets of training pairs for one patent. The first record wins.

use std::collections::HashSet;

use crate::models::PatentRecord;

/// Result of a deduplication check.
#[derive(Debug, PartialEq, Eq)]
pub enum DedupResult {
    /// First record with this id, proceed.
    New,
    /// Id already seen earlier in the batch.
    DuplicateId(String),
}

#[derive(Debug, Default)]
pub struct BatchDeduplicator {
    seen: HashSet<String>,
    duplicates: usize,
}

impl BatchDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the record's id; later calls with the same id are duplicates.
    pub fn check(&mut self, record: &PatentRecord) -> DedupResult {
        let id = record.id.as_str();
        if self.seen.insert(id.to_string()) {
            DedupResult::New
        } else {
            self.duplicates += 1;
            DedupResult::DuplicateId(id.to_string())
        }
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
