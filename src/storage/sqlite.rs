//! SQLite checkpoint store
//!
//! This module provides the SQLite-backed implementation of the
//! CheckpointStore trait. It also records runs.

use crate::records::{EnrichedRecord, ProductRecord};
use crate::storage::rows::{CheckpointRow, ListingRow};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, RecordMap, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteCheckpointStore {
    conn: Connection,
    records: RecordMap,
    run_id: Option<i64>,
}

impl SqliteCheckpointStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            records: RecordMap::new(),
            run_id: None,
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            records: RecordMap::new(),
            run_id: None,
        })
    }

    /// The run started by `begin_run`, if any
    pub fn current_run(&self) -> Option<i64> {
        self.run_id
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn load(&mut self) -> StorageResult<usize> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, price, rating_raw, rating_normalized, link, sentiment_label,
                    sentiment_score, reviews, review_dates, review_stars
             FROM checkpoint ORDER BY position",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(CheckpointRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    price: row.get(2)?,
                    rating_raw: row.get(3)?,
                    rating_normalized: row.get(4)?,
                    link: row.get(5)?,
                    sentiment_label: row.get(6)?,
                    sentiment_score: row.get(7)?,
                    reviews: row.get(8)?,
                    review_dates: row.get(9)?,
                    review_stars: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        self.records.clear();
        for (i, row) in rows.into_iter().enumerate() {
            self.records.upsert(row.into_record(i)?);
        }

        tracing::debug!("Loaded {} checkpointed products", self.records.len());
        Ok(self.records.len())
    }

    fn has(&self, id: &str) -> bool {
        self.records.contains(id)
    }

    fn get(&self, id: &str) -> Option<&EnrichedRecord> {
        self.records.get(id)
    }

    fn upsert(&mut self, record: EnrichedRecord) {
        self.records.upsert(record);
    }

    fn flush_all(&mut self) -> StorageResult<()> {
        let rows = self
            .records
            .as_slice()
            .iter()
            .map(CheckpointRow::from_record)
            .collect::<StorageResult<Vec<_>>>()?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM checkpoint", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO checkpoint (position, id, name, price, rating_raw, rating_normalized,
                    link, sentiment_label, sentiment_score, reviews, review_dates, review_stars)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for (position, row) in rows.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    row.id,
                    row.name,
                    row.price,
                    row.rating_raw,
                    row.rating_normalized,
                    row.link,
                    row.sentiment_label,
                    row.sentiment_score,
                    row.reviews,
                    row.review_dates,
                    row.review_stars,
                ])?;
            }
        }
        tx.commit()?;

        tracing::trace!("Checkpoint rewritten with {} products", rows.len());
        Ok(())
    }

    fn records(&self) -> &[EnrichedRecord] {
        self.records.as_slice()
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.conn
            .execute_batch("DELETE FROM checkpoint; DELETE FROM listing;")?;
        self.records.clear();
        Ok(())
    }

    // ===== Listing Cache =====

    fn save_listing(&mut self, source_url: &str, products: &[ProductRecord]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM listing WHERE source_url = ?1", params![source_url])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO listing (source_url, position, id, name, price, rating_raw, link)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, product) in products.iter().enumerate() {
                let row = ListingRow::from_product(source_url, product);
                stmt.execute(params![
                    row.source_url,
                    position as i64,
                    row.id,
                    row.name,
                    row.price,
                    row.rating_raw,
                    row.link,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_listing(&self, source_url: &str) -> StorageResult<Option<Vec<ProductRecord>>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_url, id, name, price, rating_raw, link
             FROM listing WHERE source_url = ?1 ORDER BY position",
        )?;

        let products = stmt
            .query_map(params![source_url], |row| {
                Ok(ListingRow {
                    source_url: row.get(0)?,
                    id: row.get(1)?,
                    name: row.get(2)?,
                    price: row.get(3)?,
                    rating_raw: row.get(4)?,
                    link: row.get(5)?,
                })
            })?
            .map(|row| row.map(ListingRow::into_product))
            .collect::<Result<Vec<_>, _>>()?;

        if products.is_empty() {
            Ok(None)
        } else {
            Ok(Some(products))
        }
    }

    // ===== Run Management =====

    fn begin_run(&mut self, config_hash: &str) -> StorageResult<Option<i64>> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = self.conn.last_insert_rowid();
        self.run_id = Some(run_id);
        Ok(Some(run_id))
    }

    fn finish_run(&mut self, status: RunStatus) -> StorageResult<()> {
        let Some(run_id) = self.run_id else {
            return Ok(());
        };
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }
}
