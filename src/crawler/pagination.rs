//! Listing pagination
//!
//! Walks listing pages 1..N and accumulates their products. Amazon pages are
//! reached by following the next-page control one at a time with a random
//! pause in between; iHerb pages are addressed by URL template and fetched
//! through a bounded pool. Both modes drive the same state machine, so an
//! empty or blocked page ends the walk the same way.

use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::extract::{parse_listing, ListingPage, SiteLayout};
use crate::records::ProductRecord;
use crate::state::PaginationState;
use crate::url::listing_page_url;
use futures::future::join_all;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Events that move the pagination state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// Page parsed with this many products
    Loaded { count: usize },
    /// Fetch failed, timed out, or exhausted its retries
    Failed,
    Blocked,
    /// Ready to leave a page that had products
    Advance { has_next: bool },
}

/// Applies one event to the state machine
///
/// Terminal states absorb every event. Events that make no sense for a state
/// leave it unchanged.
pub fn transition(state: PaginationState, event: PageEvent, total_pages: u32) -> PaginationState {
    use PaginationState::*;

    match (state, event) {
        (Loading(page), PageEvent::Blocked) => Blocked(page),
        (Loading(page), PageEvent::Failed) => Empty(page),
        (Loading(page), PageEvent::Loaded { count: 0 }) => Empty(page),
        (Loading(page), PageEvent::Loaded { count }) => ProductsFound { page, count },
        (ProductsFound { page, .. }, PageEvent::Advance { .. }) if page >= total_pages => Done,
        (ProductsFound { page, .. }, PageEvent::Advance { has_next: false }) => NoMorePages(page),
        (ProductsFound { page, .. }, PageEvent::Advance { has_next: true }) => Loading(page + 1),
        (state, _) => state,
    }
}

/// Random pause between next-control pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDelay {
    pub min: Duration,
    pub max: Duration,
}

impl PageDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// Result of loading one listing page
#[derive(Debug)]
enum PageLoad {
    Listing(ListingPage),
    Failed,
    Blocked,
}

impl PageLoad {
    fn event(&self) -> PageEvent {
        match self {
            Self::Listing(listing) => PageEvent::Loaded {
                count: listing.products.len(),
            },
            Self::Failed => PageEvent::Failed,
            Self::Blocked => PageEvent::Blocked,
        }
    }
}

/// Walks the listing pages of one site
pub struct PaginationDriver<'a> {
    fetcher: &'a Fetcher,
    layout: &'a SiteLayout,
    total_pages: u32,
    delay: PageDelay,
    max_concurrent: usize,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        layout: &'a SiteLayout,
        total_pages: u32,
        delay: PageDelay,
        max_concurrent: usize,
    ) -> Self {
        Self {
            fetcher,
            layout,
            total_pages,
            delay,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Collects products from pages 1..N into `out`
    ///
    /// Products are appended as pages complete, so `out` holds everything
    /// gathered so far even if the caller gives up part-way. Returns the
    /// terminal state the walk ended in.
    pub async fn collect(&self, start: &Url, out: &mut Vec<ProductRecord>) -> PaginationState {
        let state = if self.layout.follows_next_control() {
            self.collect_following(start, out).await
        } else {
            self.collect_pooled(start, out).await
        };

        tracing::info!(
            "Listing walk for {} ended in {} with {} products",
            self.layout.site,
            state,
            out.len()
        );
        state
    }

    /// Next-control mode: one page at a time
    async fn collect_following(&self, start: &Url, out: &mut Vec<ProductRecord>) -> PaginationState {
        let mut state = PaginationState::Loading(1);
        let mut url = start.clone();

        loop {
            let page = match state {
                PaginationState::Loading(page) => page,
                terminal => return terminal,
            };

            tracing::debug!("Loading listing page {}: {}", page, url);
            let load = self.load(&url).await;
            state = transition(state, load.event(), self.total_pages);

            let PageLoad::Listing(listing) = load else {
                continue;
            };
            if !state.is_terminal() {
                out.extend(listing.products);
            }

            let next = listing
                .next_page
                .as_deref()
                .and_then(|href| Url::parse(href).ok());
            state = transition(
                state,
                PageEvent::Advance {
                    has_next: next.is_some(),
                },
                self.total_pages,
            );

            if let (PaginationState::Loading(_), Some(next)) = (state, next) {
                let pause = self.delay.sample();
                tracing::debug!("Waiting {:?} before the next page", pause);
                tokio::time::sleep(pause).await;
                url = next;
            }
        }
    }

    /// URL-template mode: fetch pages through a bounded pool, then replay
    /// them in page order
    async fn collect_pooled(&self, start: &Url, out: &mut Vec<ProductRecord>) -> PaginationState {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let loads = join_all((1..=self.total_pages).map(|page| {
            let semaphore = Arc::clone(&semaphore);
            let url = listing_page_url(start, page);
            async move {
                let _permit = semaphore.acquire().await;
                tracing::debug!("Loading listing page {}: {}", page, url);
                self.load(&url).await
            }
        }))
        .await;

        let mut state = PaginationState::Loading(1);
        for load in loads {
            state = transition(state, load.event(), self.total_pages);
            if let PageLoad::Listing(listing) = load {
                if !state.is_terminal() {
                    out.extend(listing.products);
                }
            }
            state = transition(state, PageEvent::Advance { has_next: true }, self.total_pages);
            if state.is_terminal() {
                break;
            }
        }
        state
    }

    async fn load(&self, url: &Url) -> PageLoad {
        match self.fetcher.fetch(url).await {
            FetchOutcome::Markup { final_url, body } => {
                let listing = parse_listing(self.layout, &body, &final_url);
                if !listing.container_present {
                    tracing::warn!("No product container on {}", final_url);
                }
                PageLoad::Listing(listing)
            }
            FetchOutcome::Blocked { marker } => {
                tracing::warn!("Listing page {} blocked ({})", url, marker);
                PageLoad::Blocked
            }
            FetchOutcome::Transient { status } => {
                tracing::warn!("Giving up on {} after repeated {}", url, status);
                PageLoad::Failed
            }
            FetchOutcome::Failed { error, timed_out } => {
                if timed_out {
                    tracing::warn!("Timed out loading {}", url);
                } else {
                    tracing::warn!("Failed to load {}: {}", url, error);
                }
                PageLoad::Failed
            }
        }
    }
}
