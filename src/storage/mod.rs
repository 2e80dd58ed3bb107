//! Storage module for persisting scrape progress
//!
//! This module handles everything written between runs:
//! - The checkpoint map of enriched products, rewritten after every product
//! - The stage-1 listing cache
//! - Run tracking (SQLite backend only)
//!
//! The backend is chosen from the checkpoint path: `.csv` selects
//! `CsvCheckpointStore`, anything else `SqliteCheckpointStore`.

mod csv_store;
mod rows;
mod schema;
mod sqlite;
mod traits;

pub use csv_store::CsvCheckpointStore;
pub use rows::{CheckpointRow, ListingRow};
pub use sqlite::SqliteCheckpointStore;
pub use traits::{CheckpointStore, RecordMap, StorageError, StorageResult};

pub(crate) use csv_store::write_rows_atomic;

use std::path::Path;

/// Opens the checkpoint store for a path
///
/// # Example
///
/// ```no_run
/// use shelf_sentiment::storage::open_store;
/// use std::path::Path;
///
/// let mut store = open_store(Path::new("./product_data.csv")).unwrap();
/// let processed = store.load().unwrap();
/// println!("{} products already processed", processed);
/// ```
pub fn open_store(path: &Path) -> StorageResult<Box<dyn CheckpointStore>> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        tracing::debug!("Using CSV checkpoint at {}", path.display());
        Ok(Box::new(CsvCheckpointStore::new(path)))
    } else {
        tracing::debug!("Using SQLite checkpoint at {}", path.display());
        Ok(Box::new(SqliteCheckpointStore::new(path)?))
    }
}

/// Represents a scrape run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
