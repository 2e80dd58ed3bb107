//! Shelf-Sentiment: product listing and review harvester
//!
//! This crate scrapes product listings and customer reviews from two retail
//! sites (Amazon search results and iHerb category pages), scores the review
//! text with a lexicon-based sentiment model, and exports the results as CSV.
//! Review crawling is checkpointed per product so an interrupted run resumes
//! where it stopped.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod records;
pub mod sentiment;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Shelf-Sentiment operations
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Browser session error: {0}")]
    Session(#[from] crawler::SessionError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported site for URL: {0}")]
    UnsupportedSite(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Failed to load sentiment lexicon: {0}")]
    Lexicon(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Shelf-Sentiment operations
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use records::{EnrichedRecord, ProductRecord, ReviewEntry};
pub use sentiment::{SentimentLabel, SentimentScorer};
pub use state::PaginationState;
pub use url::Site;
