//! Per-product review crawling
//!
//! For every product not already in the checkpoint, opens a session, reads
//! review pages 1..M, expands truncated reviews, scores the collected text
//! and checkpoints the enriched record before moving on.

use crate::crawler::fetcher::IdentityPool;
use crate::crawler::session::{Navigation, PageSession, SessionError, SessionFactory};
use crate::extract::{expandable_blocks, extract_review_page, overlay_present, SiteLayout};
use crate::records::{EnrichedRecord, ProductRecord, ReviewEntry};
use crate::sentiment::{analyze, SentimentScorer, TextCleaner};
use crate::storage::CheckpointStore;
use crate::url::review_page_url;
use crate::ShelfError;
use std::time::Duration;

/// Review crawling knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSettings {
    /// Review pages to read per product
    pub review_pages: u32,
    /// How long to wait for the review container after navigation
    pub container_wait: Duration,
    /// Pause after expanding reviews, before the snapshot
    pub settle: Duration,
}

/// Crawls reviews for a list of products
pub struct ReviewCrawler<'a> {
    layout: &'a SiteLayout,
    sessions: &'a dyn SessionFactory,
    identities: &'a IdentityPool,
    scorer: &'a dyn SentimentScorer,
    cleaner: &'a TextCleaner,
    settings: ReviewSettings,
}

impl<'a> ReviewCrawler<'a> {
    pub fn new(
        layout: &'a SiteLayout,
        sessions: &'a dyn SessionFactory,
        identities: &'a IdentityPool,
        scorer: &'a dyn SentimentScorer,
        cleaner: &'a TextCleaner,
        settings: ReviewSettings,
    ) -> Self {
        Self {
            layout,
            sessions,
            identities,
            scorer,
            cleaner,
            settings,
        }
    }

    /// Enriches every product, appending results to `out` in product order
    ///
    /// Products already in `store` are reused unchanged. Each new record is
    /// written to the store and flushed before the next product starts, so
    /// an interrupted run loses at most the product in flight.
    pub async fn enrich_all(
        &self,
        products: &[ProductRecord],
        store: &mut dyn CheckpointStore,
        out: &mut Vec<EnrichedRecord>,
    ) -> Result<(), ShelfError> {
        let total = products.len();

        for (i, product) in products.iter().enumerate() {
            if let Some(existing) = store.get(&product.id) {
                tracing::debug!("[{}/{}] {} already processed", i + 1, total, product.id);
                out.push(existing.clone());
                continue;
            }

            tracing::info!("[{}/{}] Fetching reviews for {}", i + 1, total, product.name);
            let record = self.enrich(product).await?;
            tracing::info!(
                "[{}/{}] {}: {} ({:.3})",
                i + 1,
                total,
                product.id,
                record.sentiment_label,
                record.sentiment_score
            );

            store.upsert(record.clone());
            store.flush_all()?;
            out.push(record);
        }

        Ok(())
    }

    /// Collects reviews for one product and scores them
    pub async fn enrich(&self, product: &ProductRecord) -> Result<EnrichedRecord, ShelfError> {
        let Some(link) = product.link.as_deref() else {
            tracing::debug!("{} has no link, skipping reviews", product.id);
            return Ok(self.merge(product, Vec::new()));
        };

        let mut collected = self.collect_reviews(link).await?;
        if collected.is_empty() {
            tracing::info!("No reviews found for {}", product.id);
            collected.push(ReviewEntry::no_reviews_found());
        }
        Ok(self.merge(product, collected))
    }

    fn merge(&self, product: &ProductRecord, reviews: Vec<ReviewEntry>) -> EnrichedRecord {
        let texts: Vec<&str> = reviews.iter().map(|r| r.text.as_str()).collect();
        let (sentiment_label, sentiment_score) = analyze(self.scorer, self.cleaner, &texts);

        EnrichedRecord {
            product: product.clone(),
            reviews,
            sentiment_label,
            sentiment_score,
        }
    }

    /// Opens a session, reads the review pages, and always closes it
    async fn collect_reviews(&self, link: &str) -> Result<Vec<ReviewEntry>, ShelfError> {
        let mut session = self.sessions.open(self.identities.pick()).await?;

        let collected = self.read_pages(session.as_mut(), link).await;

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close session: {}", e);
        }

        Ok(collected)
    }

    async fn read_pages(&self, session: &mut dyn PageSession, link: &str) -> Vec<ReviewEntry> {
        let reviews = &self.layout.reviews;
        let mut collected = Vec::new();

        for page in 1..=self.settings.review_pages {
            let url = match review_page_url(self.layout.site, link, page) {
                Ok(Some(url)) => url,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Cannot build review URL from {}: {}", link, e);
                    break;
                }
            };

            match session.goto(&url).await {
                Navigation::Loaded => {}
                Navigation::Blocked { marker } => {
                    tracing::warn!("Review page {} blocked ({})", url, marker);
                    break;
                }
                Navigation::Failed { error } => {
                    tracing::warn!("Failed to load review page {}: {}", url, error);
                    break;
                }
            }

            if !session
                .wait_for(reviews.container.raw, self.settings.container_wait)
                .await
            {
                tracing::debug!("No review container on page {} of {}", page, link);
                break;
            }

            let mut markup = match session.content().await {
                Ok(markup) => markup,
                Err(e) => {
                    tracing::warn!("Failed to snapshot {}: {}", url, e);
                    break;
                }
            };

            let mut expanded_any = false;
            for index in expandable_blocks(self.layout, &markup) {
                expanded_any |= self.expand(session, index).await;
            }

            if expanded_any {
                tokio::time::sleep(self.settings.settle).await;
                match session.content().await {
                    Ok(fresh) => markup = fresh,
                    Err(e) => tracing::warn!("Failed to re-snapshot {}: {}", url, e),
                }
            }

            let entries = extract_review_page(self.layout, &markup);
            tracing::debug!("Page {} of {}: {} reviews", page, link, entries.len());
            if entries.is_empty() {
                break;
            }
            collected.extend(entries);
        }

        collected
    }

    /// Clicks the expand control of one review block
    ///
    /// An overlay is removed before the click. A failed click is retried
    /// once after clearing the overlay again; if that fails too the
    /// truncated text stays. Returns whether the click went through.
    async fn expand(&self, session: &mut dyn PageSession, index: usize) -> bool {
        let reviews = &self.layout.reviews;
        let Some(expand) = &reviews.expand else {
            return false;
        };

        self.clear_overlay(session).await;
        let first = match session
            .click_within(reviews.block.raw, index, expand.raw)
            .await
        {
            Ok(()) => return true,
            Err(SessionError::Unsupported(what)) => {
                tracing::trace!("Cannot expand review {}: {} unsupported", index, what);
                return false;
            }
            Err(e) => e,
        };

        tracing::debug!("Expanding review {} failed ({}), retrying", index, first);
        self.clear_overlay(session).await;
        match session
            .click_within(reviews.block.raw, index, expand.raw)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Keeping truncated text for review {}: {}", index, e);
                false
            }
        }
    }

    async fn clear_overlay(&self, session: &mut dyn PageSession) {
        let Some(overlay) = &self.layout.reviews.overlay else {
            return;
        };

        let present = match session.content().await {
            Ok(markup) => overlay_present(self.layout, &markup),
            Err(_) => false,
        };
        if !present {
            return;
        }

        tracing::info!("Anti-automation overlay detected, removing it");
        if let Err(e) = session.remove(overlay.raw).await {
            tracing::debug!("Could not remove overlay: {}", e);
        }
    }
}
