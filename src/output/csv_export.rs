//! CSV export
//!
//! The export file is what a user downloads at the end of a run: one row per
//! product with its reviews and sentiment summary. Missing fields are
//! rendered as their sentinel text so every cell is filled.

use crate::records::{EnrichedRecord, ProductRecord, NO_LINK, NO_PRICE, NO_RATING};
use crate::storage::write_rows_atomic;
use crate::ShelfError;
use serde::Serialize;
use std::path::Path;

/// One exported product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Product ID")]
    pub product_id: String,

    #[serde(rename = "Product Name")]
    pub product_name: String,

    #[serde(rename = "Product Link")]
    pub product_link: String,

    #[serde(rename = "Price")]
    pub price: String,

    #[serde(rename = "Rating")]
    pub rating: String,

    /// Whole-star rating
    #[serde(rename = "Label")]
    pub label: Option<u8>,

    #[serde(rename = "Summary Sentiment")]
    pub summary_sentiment: String,

    #[serde(rename = "Sentiment Score")]
    pub sentiment_score: Option<f64>,

    /// JSON array of review texts
    #[serde(rename = "Reviews")]
    pub reviews: String,

    #[serde(rename = "Review Dates")]
    pub review_dates: String,

    #[serde(rename = "Review Stars")]
    pub review_stars: String,
}

impl ExportRow {
    /// Row for a product that has not been through review crawling yet
    pub fn from_product(product: &ProductRecord) -> Self {
        Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            product_link: product.link.clone().unwrap_or_else(|| NO_LINK.to_string()),
            price: product.price.clone().unwrap_or_else(|| NO_PRICE.to_string()),
            rating: product
                .rating_raw
                .clone()
                .unwrap_or_else(|| NO_RATING.to_string()),
            label: product.rating_normalized,
            summary_sentiment: String::new(),
            sentiment_score: None,
            reviews: String::new(),
            review_dates: String::new(),
            review_stars: String::new(),
        }
    }

    pub fn from_record(record: &EnrichedRecord) -> Result<Self, ShelfError> {
        let dates: Vec<Option<String>> = record
            .review_dates()
            .into_iter()
            .map(|date| date.map(|d| d.format("%Y-%m-%d").to_string()))
            .collect();

        Ok(Self {
            summary_sentiment: record.sentiment_label.as_str().to_string(),
            sentiment_score: Some(record.sentiment_score),
            reviews: serde_json::to_string(&record.review_texts())?,
            review_dates: serde_json::to_string(&dates)?,
            review_stars: serde_json::to_string(&record.review_stars())?,
            ..Self::from_product(&record.product)
        })
    }
}

/// Writes the final export
pub fn write_export(path: &Path, records: &[EnrichedRecord]) -> Result<(), ShelfError> {
    let rows = records
        .iter()
        .map(ExportRow::from_record)
        .collect::<Result<Vec<_>, _>>()?;
    write_rows_atomic(path, &rows)?;
    tracing::info!("Exported {} products to {}", rows.len(), path.display());
    Ok(())
}

/// Writes the stage-1 products gathered before a failure
pub fn write_partial_products(path: &Path, products: &[ProductRecord]) -> Result<(), ShelfError> {
    let rows: Vec<ExportRow> = products.iter().map(ExportRow::from_product).collect();
    write_rows_atomic(path, &rows)?;
    tracing::warn!(
        "Wrote {} partially processed products to {}",
        rows.len(),
        path.display()
    );
    Ok(())
}

/// Writes the enriched records gathered before a failure
pub fn write_partial_records(path: &Path, records: &[EnrichedRecord]) -> Result<(), ShelfError> {
    let rows = records
        .iter()
        .map(ExportRow::from_record)
        .collect::<Result<Vec<_>, _>>()?;
    write_rows_atomic(path, &rows)?;
    tracing::warn!(
        "Wrote {} partially processed products to {}",
        rows.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ReviewEntry, NO_REVIEWS_FOUND};
    use crate::sentiment::SentimentLabel;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn enriched() -> EnrichedRecord {
        EnrichedRecord {
            product: ProductRecord::new(
                "62118",
                "Omega-3",
                Some("$13.00".to_string()),
                Some("4.8/5".to_string()),
                Some("https://www.iherb.com/pr/omega/62118".to_string()),
            ),
            reviews: vec![
                ReviewEntry {
                    text: "Love it".to_string(),
                    posted_date: NaiveDate::from_ymd_opt(2024, 3, 3),
                    star_count: Some(5),
                },
                ReviewEntry::new("Fine"),
            ],
            sentiment_label: SentimentLabel::Positive,
            sentiment_score: 0.5,
        }
    }

    #[test]
    fn test_row_from_record() {
        let row = ExportRow::from_record(&enriched()).unwrap();
        assert_eq!(row.product_id, "62118");
        assert_eq!(row.label, Some(5));
        assert_eq!(row.summary_sentiment, "Positive");
        assert_eq!(row.sentiment_score, Some(0.5));
        assert_eq!(row.reviews, r#"["Love it","Fine"]"#);
        assert_eq!(row.review_dates, r#"["2024-03-03",null]"#);
        assert_eq!(row.review_stars, "[5,null]");
    }

    #[test]
    fn test_missing_fields_use_sentinels() {
        let product = ProductRecord::new("B01", "Thing", None, None, None);
        let row = ExportRow::from_product(&product);
        assert_eq!(row.price, NO_PRICE);
        assert_eq!(row.rating, NO_RATING);
        assert_eq!(row.product_link, NO_LINK);
        assert_eq!(row.label, None);
    }

    #[test]
    fn test_export_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("export.csv");

        let mut no_reviews = enriched();
        no_reviews.product.id = "70316".to_string();
        no_reviews.reviews = vec![ReviewEntry::no_reviews_found()];
        no_reviews.sentiment_label = SentimentLabel::NoReviews;
        no_reviews.sentiment_score = 0.0;

        write_export(&path, &[enriched(), no_reviews]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            vec![
                "Product ID",
                "Product Name",
                "Product Link",
                "Price",
                "Rating",
                "Label",
                "Summary Sentiment",
                "Sentiment Score",
                "Reviews",
                "Review Dates",
                "Review Stars"
            ]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "70316");
        assert_eq!(&rows[1][6], "No Reviews");
        assert!(rows[1][8].contains(NO_REVIEWS_FOUND));
    }

    #[test]
    fn test_partial_products() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.csv");
        let products = vec![enriched().product];

        write_partial_products(&path, &products).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "Omega-3");
        assert_eq!(&rows[0][6], "");
    }
}
