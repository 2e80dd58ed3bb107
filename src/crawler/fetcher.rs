//! HTTP fetcher implementation
//!
//! This module handles all plain HTTP requests for the crawler, including:
//! - Building the shared HTTP client
//! - Rotating the client identity (user agent) per request
//! - Retrying "server busy" responses with exponential backoff
//! - Recognizing anti-automation challenge pages
//! - Classifying everything else into a `FetchOutcome`

use crate::config::{RetryConfig, UserAgentConfig};
use rand::seq::IndexedRandom;
use reqwest::header::USER_AGENT;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Identity used if the pool is somehow empty
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0";

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Page body ready for extraction
    Markup {
        /// Final URL after redirects
        final_url: Url,
        body: String,
    },

    /// Server kept answering with a retryable status until attempts ran out
    Transient { status: u16 },

    /// Body carries an anti-automation challenge marker
    Blocked { marker: String },

    /// Network error, timeout, or a non-retryable error status
    Failed { error: String, timed_out: bool },
}

impl FetchOutcome {
    pub fn is_markup(&self) -> bool {
        matches!(self, Self::Markup { .. })
    }
}

/// Exponential backoff for retryable statuses
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub backoff_base: u32,
    pub backoff_unit: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_base: config.backoff_base,
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
            retryable_statuses: config.retryable_statuses.clone(),
        }
    }

    /// Delay before retry `k` (1-based): `unit * base^k`
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(self.backoff_base.saturating_pow(retry))
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Pool of client identity strings, one picked at random per request
#[derive(Debug, Clone)]
pub struct IdentityPool {
    agents: Vec<String>,
}

impl IdentityPool {
    pub fn new(agents: Vec<String>) -> Self {
        Self { agents }
    }

    pub fn from_config(config: &UserAgentConfig) -> Self {
        Self::new(config.pool.clone())
    }

    /// Picks a random identity
    pub fn pick(&self) -> &str {
        self.agents
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or(FALLBACK_USER_AGENT)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Recognizes full-page anti-automation challenges by body substring
#[derive(Debug, Clone, Default)]
pub struct BlockDetector {
    markers: Vec<String>,
}

impl BlockDetector {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    /// Returns the first marker found in the body
    pub fn detect(&self, body: &str) -> Option<&str> {
        self.markers
            .iter()
            .find(|marker| body.contains(marker.as_str()))
            .map(String::as_str)
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent is set per request from the identity pool, so the client
/// carries none of its own.
///
/// # Example
///
/// ```no_run
/// use shelf_sentiment::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP page fetcher
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    identities: IdentityPool,
    detector: BlockDetector,
}

impl Fetcher {
    pub fn new(
        client: Client,
        retry: RetryPolicy,
        identities: IdentityPool,
        detector: BlockDetector,
    ) -> Self {
        Self {
            client,
            retry,
            identities,
            detector,
        }
    }

    pub fn identities(&self) -> &IdentityPool {
        &self.identities
    }

    pub fn detector(&self) -> &BlockDetector {
        &self.detector
    }

    /// Fetches a URL with a random identity
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        self.fetch_as(url, self.identities.pick()).await
    }

    /// Fetches a URL with a fixed identity
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Challenge marker in body (any status) | Immediate → Blocked |
    /// | Retryable status | Retry after `unit * base^k`, then Transient |
    /// | Other error status | Immediate → Failed |
    /// | Timeout / connection error | Immediate → Failed |
    pub async fn fetch_as(&self, url: &Url, user_agent: &str) -> FetchOutcome {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let response = match self
                .client
                .get(url.clone())
                .header(USER_AGENT, user_agent)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => return failed(url, &e),
            };

            let status = response.status();
            let final_url = response.url().clone();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => return failed(url, &e),
            };

            // A challenge page is blocked whatever status it came with
            if let Some(marker) = self.detector.detect(&body) {
                tracing::warn!("Challenge page at {} ({})", final_url, status.as_u16());
                return FetchOutcome::Blocked {
                    marker: marker.to_string(),
                };
            }

            if self.retry.is_retryable(status.as_u16()) {
                if attempt >= self.retry.max_attempts {
                    tracing::warn!(
                        "{} still answering {} after {} attempts",
                        url,
                        status.as_u16(),
                        attempt
                    );
                    return FetchOutcome::Transient {
                        status: status.as_u16(),
                    };
                }

                let delay = self.retry.backoff(attempt);
                tracing::debug!(
                    "{} answered {}, retry {} in {:?}",
                    url,
                    status.as_u16(),
                    attempt,
                    delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                return FetchOutcome::Failed {
                    error: format!("HTTP {}", status.as_u16()),
                    timed_out: false,
                };
            }

            return FetchOutcome::Markup { final_url, body };
        }
    }
}

fn failed(url: &Url, error: &reqwest::Error) -> FetchOutcome {
    tracing::debug!("Fetch of {} failed: {}", url, error);
    FetchOutcome::Failed {
        error: error.to_string(),
        timed_out: error.is_timeout(),
    }
}
