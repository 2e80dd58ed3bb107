//! Flat row forms of the records
//!
//! Both backends store one row per product with the review lists as
//! JSON-encoded text columns. The CSV backend uses these structs directly as
//! its header layout; SQLite binds their fields.

use crate::records::{EnrichedRecord, ProductRecord, ReviewEntry};
use crate::sentiment::SentimentLabel;
use crate::storage::traits::{StorageError, StorageResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One checkpointed product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRow {
    pub id: String,
    pub name: String,
    pub price: Option<String>,
    pub rating_raw: Option<String>,
    pub rating_normalized: Option<u8>,
    pub link: Option<String>,
    pub sentiment_label: String,
    pub sentiment_score: f64,
    /// JSON array of review texts
    pub reviews: String,
    /// JSON array of ISO dates or nulls
    pub review_dates: String,
    /// JSON array of star counts or nulls
    pub review_stars: String,
}

impl CheckpointRow {
    pub fn from_record(record: &EnrichedRecord) -> StorageResult<Self> {
        let product = &record.product;
        Ok(Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price.clone(),
            rating_raw: product.rating_raw.clone(),
            rating_normalized: product.rating_normalized,
            link: product.link.clone(),
            sentiment_label: record.sentiment_label.as_str().to_string(),
            sentiment_score: record.sentiment_score,
            reviews: serde_json::to_string(&record.review_texts())?,
            review_dates: serde_json::to_string(&record.review_dates())?,
            review_stars: serde_json::to_string(&record.review_stars())?,
        })
    }

    /// Rebuilds the record; `row` is only used in error messages
    pub fn into_record(self, row: usize) -> StorageResult<EnrichedRecord> {
        let corrupt = |message: String| StorageError::Corrupt { row, message };

        let sentiment_label = SentimentLabel::parse(&self.sentiment_label)
            .ok_or_else(|| corrupt(format!("unknown label '{}'", self.sentiment_label)))?;

        let texts: Vec<String> = serde_json::from_str(&self.reviews)?;
        let dates: Vec<Option<NaiveDate>> = serde_json::from_str(&self.review_dates)?;
        let stars: Vec<Option<u8>> = serde_json::from_str(&self.review_stars)?;

        if texts.len() != dates.len() || texts.len() != stars.len() {
            return Err(corrupt(format!(
                "review columns differ in length ({}, {}, {})",
                texts.len(),
                dates.len(),
                stars.len()
            )));
        }

        let reviews = texts
            .into_iter()
            .zip(dates)
            .zip(stars)
            .map(|((text, posted_date), star_count)| ReviewEntry {
                text,
                posted_date,
                star_count,
            })
            .collect();

        Ok(EnrichedRecord {
            product: ProductRecord {
                id: self.id,
                name: self.name,
                price: self.price,
                rating_raw: self.rating_raw,
                rating_normalized: self.rating_normalized,
                link: self.link,
            },
            reviews,
            sentiment_label,
            sentiment_score: self.sentiment_score,
        })
    }
}

/// One cached listing product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRow {
    pub source_url: String,
    pub id: String,
    pub name: String,
    pub price: Option<String>,
    pub rating_raw: Option<String>,
    pub link: Option<String>,
}

impl ListingRow {
    pub fn from_product(source_url: &str, product: &ProductRecord) -> Self {
        Self {
            source_url: source_url.to_string(),
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price.clone(),
            rating_raw: product.rating_raw.clone(),
            link: product.link.clone(),
        }
    }

    pub fn into_product(self) -> ProductRecord {
        ProductRecord::new(self.id, self.name, self.price, self.rating_raw, self.link)
    }
}
