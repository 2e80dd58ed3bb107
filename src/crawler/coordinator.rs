//! Run coordinator - stage orchestration
//!
//! This module ties the pipeline together:
//! - Opening the checkpoint store and recording the run
//! - Stage 1: walking the listing pages (or reusing the cached listing)
//! - Stage 2: crawling reviews product by product
//! - Writing the export, or the partial file when a stage fails

use crate::config::{Config, ScraperConfig, SessionKind};
use crate::crawler::fetcher::{build_http_client, BlockDetector, Fetcher, IdentityPool, RetryPolicy};
use crate::crawler::pagination::{PageDelay, PaginationDriver};
use crate::crawler::reviews::{ReviewCrawler, ReviewSettings};
use crate::crawler::session::{HttpSessionFactory, SessionFactory};
use crate::extract::SiteLayout;
use crate::output::{write_export, write_partial_products, write_partial_records};
use crate::records::{ProductRecord, NO_REVIEWS_FOUND};
use crate::sentiment::{LexiconScorer, TextCleaner};
use crate::state::PaginationState;
use crate::storage::{open_store, CheckpointStore, RunStatus};
use crate::url::{classify_site, parse_listing_url, Site};
use crate::ShelfError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Per-invocation options layered over the configuration
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Listing URL to start from
    pub url: String,
    /// Overrides `scraper.site` and host inference
    pub site: Option<Site>,
    /// Overrides `scraper.listing-pages`
    pub listing_pages: Option<u32>,
    /// Overrides `scraper.review-pages`
    pub review_pages: Option<u32>,
    /// Clear the checkpoint and listing cache before starting
    pub fresh: bool,
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub site: Site,
    /// How the listing walk ended; None when the cached listing was reused
    pub listing_state: Option<PaginationState>,
    pub products: usize,
    /// Reviews collected across all products, sentinels excluded
    pub reviews: usize,
    pub export_path: PathBuf,
}

/// Picks the site layout for a listing URL
///
/// An explicit choice wins over `scraper.site`, which wins over the URL host.
pub fn resolve_site(
    url: &Url,
    explicit: Option<Site>,
    config: &ScraperConfig,
) -> Result<Site, ShelfError> {
    explicit
        .or(config.site)
        .or_else(|| classify_site(url))
        .ok_or_else(|| ShelfError::UnsupportedSite(url.to_string()))
}

/// Main run coordinator
pub struct Coordinator {
    config: Config,
    config_hash: String,
    options: RunOptions,
    start: Url,
    layout: SiteLayout,
    fetcher: Fetcher,
    scorer: LexiconScorer,
    cleaner: TextCleaner,
    store: Box<dyn CheckpointStore>,
    sessions: Option<Box<dyn SessionFactory>>,
}

impl Coordinator {
    /// Creates a coordinator and loads the checkpoint
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, recorded on the run
    /// * `options` - Listing URL and command-line overrides
    pub fn new(
        config: Config,
        config_hash: impl Into<String>,
        options: RunOptions,
    ) -> Result<Self, ShelfError> {
        let start = parse_listing_url(&options.url)?;
        let site = resolve_site(&start, options.site, &config.scraper)?;
        let layout = SiteLayout::for_site(site, config.scraper.max_reviews_per_product)?;

        let client = build_http_client(Duration::from_millis(config.scraper.request_timeout_ms))?;
        let fetcher = Fetcher::new(
            client,
            RetryPolicy::from_config(&config.retry),
            IdentityPool::from_config(&config.user_agents),
            BlockDetector::new(layout.block_markers.clone()),
        );

        let scorer = match &config.sentiment.lexicon_path {
            Some(path) => {
                let scorer = LexiconScorer::from_file(Path::new(path))?;
                tracing::info!("Loaded {} lexicon entries from {}", scorer.len(), path);
                scorer
            }
            None => LexiconScorer::builtin(),
        };

        let mut store = open_store(Path::new(&config.output.checkpoint_path))?;
        if options.fresh {
            tracing::info!("Starting fresh, clearing checkpoint");
            store.clear()?;
        }
        let processed = store.load()?;
        if processed > 0 {
            tracing::info!("Resuming with {} products already processed", processed);
        }

        tracing::info!("Scraping {} listing at {}", site, start);

        Ok(Self {
            config,
            config_hash: config_hash.into(),
            options,
            start,
            layout,
            fetcher,
            scorer,
            cleaner: TextCleaner::new(),
            store,
            sessions: None,
        })
    }

    /// Uses `sessions` for stage 2 instead of the configured session kind
    pub fn with_sessions(mut self, sessions: Box<dyn SessionFactory>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn site(&self) -> Site {
        self.layout.site
    }

    /// Runs both stages and writes the export
    ///
    /// On failure the records gathered so far are written to the partial
    /// path before the error is returned.
    pub async fn run(&mut self) -> Result<RunSummary, ShelfError> {
        if let Some(run_id) = self.store.begin_run(&self.config_hash)? {
            tracing::info!("Starting run {}", run_id);
        }

        let result = self.run_stages().await;

        let status = if result.is_ok() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        if let Err(e) = self.store.finish_run(status) {
            tracing::warn!("Failed to record run status: {}", e);
        }

        result
    }

    async fn run_stages(&mut self) -> Result<RunSummary, ShelfError> {
        let (products, listing_state) = self.listing_stage().await?;
        if products.is_empty() {
            tracing::warn!("No products found on the listing");
        }

        let sessions = match self.open_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                self.flush_partial(|path| write_partial_products(path, &products));
                return Err(e);
            }
        };

        let settings = ReviewSettings {
            review_pages: self
                .options
                .review_pages
                .unwrap_or(self.config.scraper.review_pages),
            container_wait: Duration::from_millis(self.config.scraper.review_wait_ms),
            settle: Duration::from_millis(self.config.scraper.expand_settle_ms),
        };
        let crawler = ReviewCrawler::new(
            &self.layout,
            sessions.as_ref(),
            self.fetcher.identities(),
            &self.scorer,
            &self.cleaner,
            settings,
        );

        let mut enriched = Vec::with_capacity(products.len());
        let outcome = crawler
            .enrich_all(&products, self.store.as_mut(), &mut enriched)
            .await;
        sessions.shutdown().await;

        if let Err(e) = outcome {
            tracing::error!("Review crawling failed: {}", e);
            self.flush_partial(|path| write_partial_records(path, &enriched));
            return Err(e);
        }

        let export_path = PathBuf::from(&self.config.output.export_path);
        write_export(&export_path, &enriched)?;

        let reviews = enriched
            .iter()
            .flat_map(|r| r.reviews.iter())
            .filter(|r| r.text != NO_REVIEWS_FOUND)
            .count();

        Ok(RunSummary {
            site: self.layout.site,
            listing_state,
            products: enriched.len(),
            reviews,
            export_path,
        })
    }

    /// Stage 1: the listing walk, or the listing cached by an earlier run
    async fn listing_stage(
        &mut self,
    ) -> Result<(Vec<ProductRecord>, Option<PaginationState>), ShelfError> {
        let scraper = &self.config.scraper;
        let pages = self.options.listing_pages.unwrap_or(scraper.listing_pages);
        let source = listing_cache_key(&self.start, pages);

        if let Some(cached) = self.store.load_listing(&source)? {
            tracing::info!("Reusing {} cached products for {}", cached.len(), source);
            return Ok((cached, None));
        }

        let delay = PageDelay::new(
            Duration::from_millis(scraper.page_delay_min_ms),
            Duration::from_millis(scraper.page_delay_max_ms),
        );
        let driver = PaginationDriver::new(
            &self.fetcher,
            &self.layout,
            pages,
            delay,
            scraper.max_concurrent_pages as usize,
        );

        let mut products = Vec::new();
        let state = driver.collect(&self.start, &mut products).await;
        let products = dedup_products(products);
        tracing::info!("Listing walk ended ({}): {} products", state, products.len());

        // An empty listing is not cached so the next run tries again
        if !products.is_empty() {
            if let Err(e) = self.store.save_listing(&source, &products) {
                self.flush_partial(|path| write_partial_products(path, &products));
                return Err(e.into());
            }
        }

        Ok((products, Some(state)))
    }

    async fn open_sessions(&mut self) -> Result<Box<dyn SessionFactory>, ShelfError> {
        if let Some(sessions) = self.sessions.take() {
            return Ok(sessions);
        }

        match self.config.scraper.session {
            SessionKind::Http => Ok(Box::new(HttpSessionFactory::new(self.fetcher.clone()))),
            #[cfg(feature = "chromium")]
            SessionKind::Chromium => {
                let factory = crate::crawler::browser::ChromiumSessionFactory::launch(
                    self.fetcher.detector().clone(),
                    Duration::from_millis(self.config.scraper.request_timeout_ms),
                )
                .await?;
                Ok(Box::new(factory))
            }
            #[cfg(not(feature = "chromium"))]
            SessionKind::Chromium => Err(crate::ConfigError::Validation(
                "session = \"chromium\" requires building with the `chromium` feature"
                    .to_string(),
            )
            .into()),
        }
    }

    /// Writes the partial file, logging rather than masking the original error
    fn flush_partial<F>(&self, write: F)
    where
        F: FnOnce(&Path) -> Result<(), ShelfError>,
    {
        let path = Path::new(&self.config.output.partial_path);
        if let Err(e) = write(path) {
            tracing::error!("Failed to write partial results to {}: {}", path.display(), e);
        }
    }
}

/// Listing cache key: a walk over fewer pages never stands in for a longer one
fn listing_cache_key(start: &Url, pages: u32) -> String {
    format!("{} [pages={}]", start, pages)
}

/// Keeps the first occurrence of each product id
fn dedup_products(products: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| {
            let fresh = seen.insert(p.id.clone());
            if !fresh {
                tracing::debug!("Dropping repeated product {}", p.id);
            }
            fresh
        })
        .collect()
}

/// Convenience function to run a scrape with the given configuration
pub async fn run_scrape(
    config: Config,
    config_hash: &str,
    options: RunOptions,
) -> Result<RunSummary, ShelfError> {
    let mut coordinator = Coordinator::new(config, config_hash, options)?;
    coordinator.run().await
}
