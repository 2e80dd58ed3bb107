use crate::config::types::{Config, OutputConfig, RetryConfig, ScraperConfig, UserAgentConfig};
use crate::config::SentimentConfig;
use crate::ConfigError;
use std::path::Path;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_retry_config(&config.retry)?;
    validate_user_agents(&config.user_agents)?;
    validate_output_config(&config.output)?;
    validate_sentiment_config(&config.sentiment)?;
    Ok(())
}

/// Validates scraping behavior
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.listing_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "listing_pages must be >= 1, got {}",
            config.listing_pages
        )));
    }

    if config.review_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "review_pages must be >= 1, got {}",
            config.review_pages
        )));
    }

    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 32, got {}",
            config.max_concurrent_pages
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.page_delay_min_ms > config.page_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "page_delay_min_ms ({}) must not exceed page_delay_max_ms ({})",
            config.page_delay_min_ms, config.page_delay_max_ms
        )));
    }

    if config.max_reviews_per_product < 1 {
        return Err(ConfigError::Validation(
            "max_reviews_per_product must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_base < 1 {
        return Err(ConfigError::Validation(format!(
            "backoff_base must be >= 1, got {}",
            config.backoff_base
        )));
    }

    for status in &config.retryable_statuses {
        if !(100..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "retryable status {} is not an HTTP status code",
                status
            )));
        }
    }

    Ok(())
}

/// Validates the client identity pool
fn validate_user_agents(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.pool.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents pool cannot be empty".to_string(),
        ));
    }

    for agent in &config.pool {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agents pool cannot contain blank entries".to_string(),
            ));
        }
        // must be usable as a header value
        if agent.chars().any(|c| c.is_control()) {
            return Err(ConfigError::Validation(format!(
                "user agent contains control characters: {:?}",
                agent
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    if config.export_path.is_empty() {
        return Err(ConfigError::Validation(
            "export_path cannot be empty".to_string(),
        ));
    }

    if config.partial_path.is_empty() {
        return Err(ConfigError::Validation(
            "partial_path cannot be empty".to_string(),
        ));
    }

    if config.export_path == config.checkpoint_path || config.partial_path == config.checkpoint_path
    {
        return Err(ConfigError::Validation(
            "export_path and partial_path must differ from checkpoint_path".to_string(),
        ));
    }

    Ok(())
}

/// Validates the sentiment lexicon location
fn validate_sentiment_config(config: &SentimentConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.lexicon_path {
        if !Path::new(path).is_file() {
            return Err(ConfigError::Validation(format!(
                "lexicon_path '{}' is not a file",
                path
            )));
        }
    }
    Ok(())
}
