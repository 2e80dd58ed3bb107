//! Output module for exports and reports
//!
//! This module handles:
//! - The final CSV export of enriched products
//! - Partial exports written when a run fails part-way
//! - Statistics over the checkpoint

mod csv_export;
pub mod stats;

pub use csv_export::{write_export, write_partial_products, write_partial_records, ExportRow};
pub use stats::{load_statistics, print_statistics, CheckpointStatistics};
