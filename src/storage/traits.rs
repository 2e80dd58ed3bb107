//! Storage traits and error types
//!
//! This module defines the checkpoint store interface and the in-memory
//! record map every backend keeps in front of its file.

use crate::records::{EnrichedRecord, ProductRecord};
use crate::storage::{RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt checkpoint row {row}: {message}")]
    Corrupt { row: usize, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persisted map from product id to enriched record
///
/// Records are held in memory in insertion order; `flush_all` rewrites the
/// whole persisted table from that map in one atomic step, so the file never
/// holds a half-written product.
pub trait CheckpointStore: Send {
    /// Reads the persisted map into memory, replacing what was there
    ///
    /// Returns the number of records loaded. A missing file is an empty map.
    fn load(&mut self) -> StorageResult<usize>;

    /// Whether a product has already been processed
    fn has(&self, id: &str) -> bool;

    fn get(&self, id: &str) -> Option<&EnrichedRecord>;

    /// Inserts or replaces a record in memory; `flush_all` persists it
    fn upsert(&mut self, record: EnrichedRecord);

    /// Atomically rewrites the persisted table from memory
    fn flush_all(&mut self) -> StorageResult<()>;

    /// All records in insertion order
    fn records(&self) -> &[EnrichedRecord];

    /// Drops every record and the listing cache, in memory and on disk
    fn clear(&mut self) -> StorageResult<()>;

    // ===== Listing Cache =====

    /// Caches the products read from a listing URL
    fn save_listing(&mut self, source_url: &str, products: &[ProductRecord]) -> StorageResult<()>;

    /// Products cached for a listing URL, if any
    fn load_listing(&self, source_url: &str) -> StorageResult<Option<Vec<ProductRecord>>>;

    // ===== Run Management =====

    /// Records the start of a run; backends without run tracking return None
    fn begin_run(&mut self, _config_hash: &str) -> StorageResult<Option<i64>> {
        Ok(None)
    }

    /// Records how the current run ended
    fn finish_run(&mut self, _status: RunStatus) -> StorageResult<()> {
        Ok(())
    }

    /// The most recent run, if the backend tracks runs
    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        Ok(None)
    }
}

/// Insertion-ordered id → record map shared by the backends
#[derive(Debug, Clone, Default)]
pub struct RecordMap {
    records: Vec<EnrichedRecord>,
    index: HashMap<String, usize>,
}

impl RecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&EnrichedRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// Replaces in place when the id exists, appends otherwise
    pub fn upsert(&mut self, record: EnrichedRecord) {
        match self.index.get(record.id()) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.id().to_string(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn as_slice(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentLabel;

    fn record(id: &str, score: f64) -> EnrichedRecord {
        EnrichedRecord {
            product: ProductRecord::new(id, "Name", None, None, None),
            reviews: Vec::new(),
            sentiment_label: SentimentLabel::from_score(score),
            sentiment_score: score,
        }
    }

    #[test]
    fn test_upsert_keeps_insertion_order() {
        let mut map = RecordMap::new();
        map.upsert(record("b", 0.1));
        map.upsert(record("a", 0.2));
        map.upsert(record("b", 0.9));

        assert_eq!(map.len(), 2);
        let ids: Vec<_> = map.as_slice().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(map.get("b").map(|r| r.sentiment_score), Some(0.9));
    }

    #[test]
    fn test_clear() {
        let mut map = RecordMap::new();
        map.upsert(record("x", 0.0));
        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains("x"));
    }
}
