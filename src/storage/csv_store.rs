//! CSV checkpoint store
//!
//! Keeps the checkpoint as a plain CSV file that can be opened in a
//! spreadsheet. Every write goes to a temporary sibling first and is renamed
//! over the target, so a crash mid-write leaves the previous file intact.

use crate::records::{EnrichedRecord, ProductRecord};
use crate::storage::rows::{CheckpointRow, ListingRow};
use crate::storage::traits::{CheckpointStore, RecordMap, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// CSV storage backend
pub struct CsvCheckpointStore {
    path: PathBuf,
    listing_path: PathBuf,
    records: RecordMap,
}

impl CsvCheckpointStore {
    /// Uses `path` for the checkpoint and `<stem>.listing.csv` beside it for
    /// the listing cache. Nothing is read until `load`.
    pub fn new(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkpoint".to_string());
        let listing_path = path.with_file_name(format!("{}.listing.csv", stem));

        Self {
            path: path.to_path_buf(),
            listing_path,
            records: RecordMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn listing_path(&self) -> &Path {
        &self.listing_path
    }
}

impl CheckpointStore for CsvCheckpointStore {
    fn load(&mut self) -> StorageResult<usize> {
        self.records.clear();
        let rows: Vec<CheckpointRow> = read_rows(&self.path)?;
        for (i, row) in rows.into_iter().enumerate() {
            self.records.upsert(row.into_record(i)?);
        }

        tracing::debug!(
            "Loaded {} checkpointed products from {}",
            self.records.len(),
            self.path.display()
        );
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
        write_rows_atomic(&self.path, &rows)
    }

    fn records(&self) -> &[EnrichedRecord] {
        self.records.as_slice()
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.records.clear();
        for path in [&self.path, &self.listing_path] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    // ===== Listing Cache =====

    fn save_listing(&mut self, source_url: &str, products: &[ProductRecord]) -> StorageResult<()> {
        // Rows for other listing URLs are kept
        let mut rows: Vec<ListingRow> = read_rows::<ListingRow>(&self.listing_path)?
            .into_iter()
            .filter(|row| row.source_url != source_url)
            .collect();
        rows.extend(
            products
                .iter()
                .map(|product| ListingRow::from_product(source_url, product)),
        );
        write_rows_atomic(&self.listing_path, &rows)
    }

    fn load_listing(&self, source_url: &str) -> StorageResult<Option<Vec<ProductRecord>>> {
        let products: Vec<ProductRecord> = read_rows::<ListingRow>(&self.listing_path)?
            .into_iter()
            .filter(|row| row.source_url == source_url)
            .map(ListingRow::into_product)
            .collect();

        if products.is_empty() {
            Ok(None)
        } else {
            Ok(Some(products))
        }
    }
}

/// Reads every row of a CSV file; a missing file has no rows
fn read_rows<T: DeserializeOwned>(path: &Path) -> StorageResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Writes rows to a temporary sibling, then renames it over `path`
pub(crate) fn write_rows_atomic<T: Serialize>(path: &Path, rows: &[T]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_sibling(path);
    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
