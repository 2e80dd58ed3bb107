//! Live page sessions for review crawling
//!
//! A `PageSession` is a handle on one loaded page that the review crawler can
//! navigate, wait on, snapshot, and interact with. Two implementations exist:
//! `HttpSession` serves plain HTTP snapshots and cannot interact, and the
//! Chromium session (feature `chromium`) drives a rendered page.

use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Session-level errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to open session: {0}")]
    Open(String),

    #[error("No page loaded")]
    NoPage,

    #[error("{0} is not supported by this session")]
    Unsupported(&'static str),

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Session already closed")]
    Closed,
}

/// Result of navigating a session
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Loaded,
    /// Full-page anti-automation challenge
    Blocked { marker: String },
    Failed { error: String },
}

/// A live page handle
#[async_trait]
pub trait PageSession: Send {
    /// Navigates to a URL
    async fn goto(&mut self, url: &Url) -> Navigation;

    /// Waits up to `timeout` for `selector` to match; false on timeout
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> bool;

    /// Snapshot of the current document markup
    async fn content(&mut self) -> Result<String, SessionError>;

    /// Clicks the first `target` inside the `index`-th match of `block`
    async fn click_within(
        &mut self,
        block: &str,
        index: usize,
        target: &str,
    ) -> Result<(), SessionError>;

    /// Removes every node matching `selector`; true if any was removed
    async fn remove(&mut self, selector: &str) -> Result<bool, SessionError>;

    /// Releases the page; further calls fail
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens sessions, one per product
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, user_agent: &str) -> Result<Box<dyn PageSession>, SessionError>;

    /// Releases shared resources (a browser process) at the end of a run
    async fn shutdown(&self) {}
}

/// Session over plain HTTP fetches
///
/// The document is whatever the server returned; nothing runs, so expand
/// controls and overlays cannot be acted on.
pub struct HttpSession {
    fetcher: Fetcher,
    user_agent: String,
    current: Option<String>,
    closed: bool,
}

impl HttpSession {
    pub fn new(fetcher: Fetcher, user_agent: impl Into<String>) -> Self {
        Self {
            fetcher,
            user_agent: user_agent.into(),
            current: None,
            closed: false,
        }
    }
}

#[async_trait]
impl PageSession for HttpSession {
    async fn goto(&mut self, url: &Url) -> Navigation {
        if self.closed {
            return Navigation::Failed {
                error: SessionError::Closed.to_string(),
            };
        }

        self.current = None;
        match self.fetcher.fetch_as(url, &self.user_agent).await {
            FetchOutcome::Markup { body, .. } => {
                self.current = Some(body);
                Navigation::Loaded
            }
            FetchOutcome::Blocked { marker } => Navigation::Blocked { marker },
            FetchOutcome::Transient { status } => Navigation::Failed {
                error: format!("server busy ({})", status),
            },
            FetchOutcome::Failed { error, .. } => Navigation::Failed { error },
        }
    }

    async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> bool {
        // A static document either has the node or never will
        let (Some(body), Ok(selector)) = (&self.current, Selector::parse(selector)) else {
            return false;
        };
        Html::parse_document(body).select(&selector).next().is_some()
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.current.clone().ok_or(SessionError::NoPage)
    }

    async fn click_within(
        &mut self,
        _block: &str,
        _index: usize,
        _target: &str,
    ) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("click"))
    }

    async fn remove(&mut self, _selector: &str) -> Result<bool, SessionError> {
        Err(SessionError::Unsupported("node removal"))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}

/// Opens `HttpSession`s sharing one fetcher
pub struct HttpSessionFactory {
    fetcher: Fetcher,
}

impl HttpSessionFactory {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn open(&self, user_agent: &str) -> Result<Box<dyn PageSession>, SessionError> {
        Ok(Box::new(HttpSession::new(self.fetcher.clone(), user_agent)))
    }
}
