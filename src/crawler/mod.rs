//! Crawler module for page fetching and run orchestration
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching with retry, identity rotation and block detection
//! - Listing pagination
//! - Per-product review crawling through page sessions
//! - Overall run coordination

#[cfg(feature = "chromium")]
mod browser;
mod coordinator;
mod fetcher;
mod pagination;
mod reviews;
mod session;

#[cfg(feature = "chromium")]
pub use browser::{ChromiumSession, ChromiumSessionFactory};
pub use coordinator::{resolve_site, run_scrape, Coordinator, RunOptions, RunSummary};
pub use fetcher::{
    build_http_client, BlockDetector, FetchOutcome, Fetcher, IdentityPool, RetryPolicy,
};
pub use pagination::{transition, PageDelay, PageEvent, PaginationDriver};
pub use reviews::{ReviewCrawler, ReviewSettings};
pub use session::{
    HttpSession, HttpSessionFactory, Navigation, PageSession, SessionError, SessionFactory,
};
