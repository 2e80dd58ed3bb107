//! Product and review records
//!
//! These are the entities that flow through the pipeline: a `ProductRecord`
//! is produced by listing extraction, `ReviewEntry` values by review
//! extraction, and an `EnrichedRecord` is the merged, scored result that the
//! checkpoint store and the CSV export persist.

use crate::sentiment::SentimentLabel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder name when a listing item has no title node
pub const NO_PRODUCT_NAME: &str = "No Product Name";

/// Placeholder price for the export when no price node was found
pub const NO_PRICE: &str = "No Price";

/// Placeholder rating for the export when no rating node was found
pub const NO_RATING: &str = "No Rating";

/// Placeholder link for the export when no product link was found
pub const NO_LINK: &str = "No Link";

/// Review text used when a review block carries no text node
pub const NO_REVIEW_TEXT: &str = "No Review Text";

/// Review text recorded when a product yielded no reviews at all
pub const NO_REVIEWS_FOUND: &str = "No Reviews Found";

/// One product summary from a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Site-assigned identifier, unique across runs
    pub id: String,

    /// Product title
    pub name: String,

    /// Display price, as shown on the listing
    pub price: Option<String>,

    /// Rating text as shown on the listing (e.g. "4.6/5")
    pub rating_raw: Option<String>,

    /// Rating rounded to a whole star count
    pub rating_normalized: Option<u8>,

    /// Absolute URL of the product page
    pub link: Option<String>,
}

impl ProductRecord {
    /// Builds a record, deriving `rating_normalized` from `rating_raw`
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Option<String>,
        rating_raw: Option<String>,
        link: Option<String>,
    ) -> Self {
        let rating_normalized = rating_raw.as_deref().and_then(normalize_rating);
        Self {
            id: id.into(),
            name: name.into(),
            price,
            rating_raw,
            rating_normalized,
            link,
        }
    }
}

/// One customer review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub text: String,
    pub posted_date: Option<NaiveDate>,
    pub star_count: Option<u8>,
}

impl ReviewEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            posted_date: None,
            star_count: None,
        }
    }

    /// The entry recorded for a product whose reviews could not be found
    pub fn no_reviews_found() -> Self {
        Self::new(NO_REVIEWS_FOUND)
    }
}

/// A product merged with its reviews and their sentiment summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub product: ProductRecord,
    pub reviews: Vec<ReviewEntry>,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f64,
}

impl EnrichedRecord {
    pub fn id(&self) -> &str {
        &self.product.id
    }

    /// Review texts in fetch order
    pub fn review_texts(&self) -> Vec<&str> {
        self.reviews.iter().map(|r| r.text.as_str()).collect()
    }

    /// Review dates, index-aligned with `review_texts`
    pub fn review_dates(&self) -> Vec<Option<NaiveDate>> {
        self.reviews.iter().map(|r| r.posted_date).collect()
    }

    /// Star counts, index-aligned with `review_texts`
    pub fn review_stars(&self) -> Vec<Option<u8>> {
        self.reviews.iter().map(|r| r.star_count).collect()
    }
}

/// Rounds a raw rating to a whole star count
///
/// The leading number of the string is used, so both "4.6/5" and
/// "4.6 out of 5 stars" work. A fractional part strictly above 0.5 rounds up;
/// exactly 0.5 and below round down.
///
/// # Examples
///
/// ```
/// use shelf_sentiment::records::normalize_rating;
///
/// assert_eq!(normalize_rating("4.6/5"), Some(5));
/// assert_eq!(normalize_rating("4.5/5"), Some(4));
/// assert_eq!(normalize_rating("No Rating"), None);
/// ```
pub fn normalize_rating(raw: &str) -> Option<u8> {
    let numeric: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = numeric.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let whole = value.floor();
    let rounded = if value - whole > 0.5 { whole + 1.0 } else { whole };
    if rounded > u8::MAX as f64 {
        return None;
    }
    Some(rounded as u8)
}
