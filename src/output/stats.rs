//! Statistics over the checkpoint
//!
//! This module summarizes what a checkpoint holds: how many products were
//! processed, how their sentiment labels are distributed, and how the last
//! run ended.

use crate::records::NO_REVIEWS_FOUND;
use crate::sentiment::SentimentLabel;
use crate::storage::{CheckpointStore, RunRecord};
use crate::ShelfError;
use std::collections::HashMap;

/// Checkpoint statistics summary
#[derive(Debug, Clone)]
pub struct CheckpointStatistics {
    /// Number of products in the checkpoint
    pub total_products: u64,

    /// Count of products by sentiment label
    pub products_by_label: HashMap<SentimentLabel, u64>,

    /// Reviews collected across all products, sentinels excluded
    pub total_reviews: u64,

    /// Mean sentiment score over products that have reviews
    pub average_score: Option<f64>,

    /// Most recent run, when the backend tracks runs
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from a checkpoint store
///
/// The store must already be loaded.
pub fn load_statistics(store: &dyn CheckpointStore) -> Result<CheckpointStatistics, ShelfError> {
    let records = store.records();

    let mut products_by_label = HashMap::new();
    let mut total_reviews = 0;
    let mut score_sum = 0.0;
    let mut scored = 0u64;

    for record in records {
        *products_by_label.entry(record.sentiment_label).or_insert(0) += 1;

        total_reviews += record
            .reviews
            .iter()
            .filter(|r| r.text != NO_REVIEWS_FOUND)
            .count() as u64;

        if record.sentiment_label != SentimentLabel::NoReviews {
            score_sum += record.sentiment_score;
            scored += 1;
        }
    }

    Ok(CheckpointStatistics {
        total_products: records.len() as u64,
        products_by_label,
        total_reviews,
        average_score: (scored > 0).then(|| score_sum / scored as f64),
        latest_run: store.latest_run()?,
    })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CheckpointStatistics) {
    println!("=== Checkpoint Statistics ===\n");

    println!("Overview:");
    println!("  Products processed: {}", stats.total_products);
    println!("  Reviews collected: {}", stats.total_reviews);
    match stats.average_score {
        Some(score) => println!("  Average sentiment score: {:.4}", score),
        None => println!("  Average sentiment score: n/a"),
    }
    println!();

    println!("Products by Sentiment:");
    for label in SentimentLabel::all() {
        let count = stats.products_by_label.get(&label).copied().unwrap_or(0);
        let percentage = if stats.total_products > 0 {
            (count as f64 / stats.total_products as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  Run ID: {}", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!("  Config hash: {}", run.config_hash);
    }
}
