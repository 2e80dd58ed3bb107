use crate::url::Site;
use serde::Deserialize;

/// Main configuration structure for Shelf-Sentiment
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agents", default)]
    pub user_agents: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
}

/// How review pages are loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Plain HTTP snapshots; expand controls cannot be clicked
    #[default]
    Http,
    /// Headless Chromium (requires the `chromium` feature)
    Chromium,
}

/// Scraping behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Site layout to use; inferred from the listing URL when absent
    #[serde(default)]
    pub site: Option<Site>,

    /// Number of listing pages to read
    #[serde(rename = "listing-pages", default = "default_listing_pages")]
    pub listing_pages: u32,

    /// Number of review pages to read per product
    #[serde(rename = "review-pages", default = "default_review_pages")]
    pub review_pages: u32,

    /// Maximum number of listing pages fetched at once (URL-template paging)
    #[serde(
        rename = "max-concurrent-pages",
        default = "default_max_concurrent_pages"
    )]
    pub max_concurrent_pages: u32,

    /// Timeout for a single page load (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long to wait for the review container to appear (milliseconds)
    #[serde(rename = "review-wait-ms", default = "default_review_wait_ms")]
    pub review_wait_ms: u64,

    /// Pause after expanding truncated reviews (milliseconds)
    #[serde(rename = "expand-settle-ms", default = "default_expand_settle_ms")]
    pub expand_settle_ms: u64,

    /// Lower bound of the random pause between next-control pages (milliseconds)
    #[serde(rename = "page-delay-min-ms", default = "default_page_delay_min_ms")]
    pub page_delay_min_ms: u64,

    /// Upper bound of the random pause between next-control pages (milliseconds)
    #[serde(rename = "page-delay-max-ms", default = "default_page_delay_max_ms")]
    pub page_delay_max_ms: u64,

    /// Cap on reviews read from one product page (Amazon)
    #[serde(
        rename = "max-reviews-per-product",
        default = "default_max_reviews_per_product"
    )]
    pub max_reviews_per_product: usize,

    /// Review page loader
    #[serde(default)]
    pub session: SessionKind,
}

/// Retry policy for transient server responses
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per fetch, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff multiplier; retry k waits `backoff-unit-ms * backoff-base^k`
    #[serde(rename = "backoff-base", default = "default_backoff_base")]
    pub backoff_base: u32,

    /// Backoff time unit (milliseconds)
    #[serde(rename = "backoff-unit-ms", default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// HTTP statuses treated as "server busy"
    #[serde(rename = "retryable-statuses", default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

/// Client identity strings rotated per request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_user_agent_pool")]
    pub pool: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Checkpoint file; `.csv` selects the CSV backend, anything else SQLite
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Final CSV export
    #[serde(rename = "export-path")]
    pub export_path: String,

    /// CSV written when a run fails part-way
    #[serde(rename = "partial-path", default = "default_partial_path")]
    pub partial_path: String,
}

/// Sentiment scorer configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentConfig {
    /// VADER-format lexicon replacing the built-in word list
    #[serde(rename = "lexicon-path", default)]
    pub lexicon_path: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            site: None,
            listing_pages: default_listing_pages(),
            review_pages: default_review_pages(),
            max_concurrent_pages: default_max_concurrent_pages(),
            request_timeout_ms: default_request_timeout_ms(),
            review_wait_ms: default_review_wait_ms(),
            expand_settle_ms: default_expand_settle_ms(),
            page_delay_min_ms: default_page_delay_min_ms(),
            page_delay_max_ms: default_page_delay_max_ms(),
            max_reviews_per_product: default_max_reviews_per_product(),
            session: SessionKind::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base: default_backoff_base(),
            backoff_unit_ms: default_backoff_unit_ms(),
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            pool: default_user_agent_pool(),
        }
    }
}

fn default_listing_pages() -> u32 {
    1
}

fn default_review_pages() -> u32 {
    2
}

fn default_max_concurrent_pages() -> u32 {
    5
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_review_wait_ms() -> u64 {
    2_000
}

fn default_expand_settle_ms() -> u64 {
    1_000
}

fn default_page_delay_min_ms() -> u64 {
    2_000
}

fn default_page_delay_max_ms() -> u64 {
    5_000
}

fn default_max_reviews_per_product() -> usize {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u32 {
    2
}

fn default_backoff_unit_ms() -> u64 {
    1_000
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![503]
}

fn default_partial_path() -> String {
    "./partial_product_data.csv".to_string()
}

fn default_user_agent_pool() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/91.0.4472.124 Safari/537.36"
            .to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/91.0.4472.124 Safari/537.36"
            .to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Gecko/20100101 Firefox/89.0".to_string(),
    ]
}
