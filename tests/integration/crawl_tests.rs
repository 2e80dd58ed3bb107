//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to serve listing and review pages and run the
//! coordinator end-to-end over plain HTTP sessions.

use async_trait::async_trait;
use shelf_sentiment::config::{
    Config, OutputConfig, RetryConfig, ScraperConfig, SentimentConfig, UserAgentConfig,
};
use shelf_sentiment::crawler::{
    build_http_client, run_scrape, BlockDetector, Coordinator, Fetcher, HttpSession, IdentityPool,
    PageSession, RetryPolicy, RunOptions, SessionError, SessionFactory,
};
use shelf_sentiment::records::{EnrichedRecord, ProductRecord, ReviewEntry, NO_REVIEWS_FOUND};
use shelf_sentiment::sentiment::SentimentLabel;
use shelf_sentiment::state::PaginationState;
use shelf_sentiment::storage::{
    CheckpointStore, CsvCheckpointStore, RunStatus, SqliteCheckpointStore,
};
use shelf_sentiment::Site;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`
fn create_test_config(dir: &Path, checkpoint: &str, listing_pages: u32) -> Config {
    Config {
        scraper: ScraperConfig {
            site: Some(Site::Iherb),
            listing_pages,
            review_pages: 2,
            request_timeout_ms: 5_000,
            review_wait_ms: 10,
            expand_settle_ms: 0,
            page_delay_min_ms: 0,
            page_delay_max_ms: 0,
            ..Default::default()
        },
        retry: RetryConfig {
            max_attempts: 2,
            backoff_unit_ms: 1,
            ..Default::default()
        },
        user_agents: UserAgentConfig {
            pool: vec!["TestAgent/1.0".to_string()],
        },
        output: OutputConfig {
            checkpoint_path: dir.join(checkpoint).display().to_string(),
            export_path: dir.join("export.csv").display().to_string(),
            partial_path: dir.join("partial.csv").display().to_string(),
        },
        sentiment: SentimentConfig::default(),
    }
}

fn options(server: &MockServer) -> RunOptions {
    RunOptions {
        url: format!("{}/c/vitamins", server.uri()),
        ..Default::default()
    }
}

fn listing_page(ids: &[&str]) -> String {
    let cells: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="product-cell-container">
                     <div class="product ga-product" id="pid_{id}">
                       <a class="absolute-link product-link" title="Product {id}" href="/pr/item/{id}"></a>
                       <a class="stars scroll-to" title="4.6/5 - 120 Reviews"></a>
                       <span class="price"><bdi>$12.50</bdi></span>
                     </div>
                   </div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div id="FilteredProducts">{cells}</div></body></html>"#)
}

fn review_page(texts: &[&str]) -> String {
    let blocks: String = texts
        .iter()
        .map(|text| {
            format!(
                r#"<div class="MuiBox-root css-1v71s4n">
                     <span data-testid="review-posted-date">Posted on Mar 3, 2024</span>
                     <span class="__react-ellipsis-js-content">{text}</span>
                   </div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div id="reviews">{blocks}</div></body></html>"#)
}

async fn mount_listing(server: &MockServer, page: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/c/vitamins"))
        .and(query_param("p", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_reviews(server: &MockServer, id: &str, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/r/item/{}", id)))
        .and(query_param("p", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn read_export(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}

fn latest_run_status(checkpoint: &Path) -> RunStatus {
    let store = SqliteCheckpointStore::new(checkpoint).unwrap();
    store.latest_run().unwrap().unwrap().status
}

/// Serves the first product over HTTP, then fails every later open
struct FailsAfterFirstOpen {
    fetcher: Fetcher,
    opened: AtomicUsize,
}

impl FailsAfterFirstOpen {
    fn new() -> Self {
        Self {
            fetcher: Fetcher::new(
                build_http_client(Duration::from_secs(5)).unwrap(),
                RetryPolicy::default(),
                IdentityPool::new(vec!["TestAgent/1.0".to_string()]),
                BlockDetector::default(),
            ),
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SessionFactory for FailsAfterFirstOpen {
    async fn open(&self, user_agent: &str) -> Result<Box<dyn PageSession>, SessionError> {
        if self.opened.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(SessionError::Open("browser exited".to_string()));
        }
        Ok(Box::new(HttpSession::new(self.fetcher.clone(), user_agent)))
    }
}

#[tokio::test]
async fn test_empty_listing_page_ends_walk() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "1", listing_page(&["P1", "P2"]), 1).await;
    mount_listing(&server, "2", listing_page(&[]), 1).await;
    mount_listing(&server, "3", listing_page(&["P5"]), 1).await;
    mount_reviews(&server, "P1", "1", review_page(&["Great value, love it"])).await;
    mount_reviews(&server, "P2", "1", review_page(&["Works well"])).await;

    let config = create_test_config(dir.path(), "checkpoint.db", 3);
    let summary = run_scrape(config, "hash", options(&server)).await.unwrap();

    assert_eq!(summary.site, Site::Iherb);
    assert_eq!(summary.listing_state, Some(PaginationState::Empty(2)));
    assert_eq!(summary.products, 2);
    assert_eq!(summary.reviews, 2);

    let rows = read_export(&dir.path().join("export.csv"));
    let ids: Vec<&str> = rows.iter().map(|r| &r[0]).collect();
    assert_eq!(ids, vec!["P1", "P2"]);
}

#[tokio::test]
async fn test_blocked_review_page_yields_sentinel_and_run_continues() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "1", listing_page(&["P7", "P8"]), 1).await;
    mount_reviews(
        &server,
        "P7",
        "1",
        "<html><body><h1>Access to this page has been denied</h1></body></html>".to_string(),
    )
    .await;
    mount_reviews(&server, "P8", "1", review_page(&["Excellent quality"])).await;

    let config = create_test_config(dir.path(), "checkpoint.db", 1);
    run_scrape(config, "hash", options(&server)).await.unwrap();

    let rows = read_export(&dir.path().join("export.csv"));
    assert_eq!(rows.len(), 2);

    let blocked = &rows[0];
    assert_eq!(&blocked[0], "P7");
    assert_eq!(&blocked[6], SentimentLabel::Mixed.as_str());
    assert_eq!(&blocked[7], "0.0");
    let texts: Vec<String> = serde_json::from_str(&blocked[8]).unwrap();
    assert_eq!(texts, vec![NO_REVIEWS_FOUND.to_string()]);

    let reviewed = &rows[1];
    assert_eq!(&reviewed[0], "P8");
    let texts: Vec<String> = serde_json::from_str(&reviewed[8]).unwrap();
    assert_eq!(texts, vec!["Excellent quality".to_string()]);
}

#[tokio::test]
async fn test_resume_skips_checkpointed_products() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), "checkpoint.csv", 1);

    // A previous run already processed P1
    let previous = EnrichedRecord {
        product: ProductRecord::new("P1", "Product P1", None, None, None),
        reviews: vec![ReviewEntry::new("Stored review")],
        sentiment_label: SentimentLabel::Negative,
        sentiment_score: -0.4,
    };
    let mut store = CsvCheckpointStore::new(Path::new(&config.output.checkpoint_path));
    store.upsert(previous);
    store.flush_all().unwrap();

    mount_listing(&server, "1", listing_page(&["P1", "P2"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/r/item/P1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page(&["Fresh"])))
        .expect(0)
        .mount(&server)
        .await;
    mount_reviews(&server, "P2", "1", review_page(&["Tastes fine"])).await;

    run_scrape(config, "hash", options(&server)).await.unwrap();

    let rows = read_export(&dir.path().join("export.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "P1");
    assert_eq!(&rows[0][6], "Negative");
    assert_eq!(&rows[0][8], r#"["Stored review"]"#);
    assert_eq!(&rows[1][0], "P2");

    // Both products are now in the checkpoint
    let mut reloaded = CsvCheckpointStore::new(&dir.path().join("checkpoint.csv"));
    assert_eq!(reloaded.load().unwrap(), 2);
    assert!(reloaded.has("P2"));
}

#[tokio::test]
async fn test_second_run_reuses_listing_cache() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Listing is fetched once across both runs
    mount_listing(&server, "1", listing_page(&["P1"]), 1).await;
    mount_reviews(&server, "P1", "1", review_page(&["Good"])).await;

    let config = create_test_config(dir.path(), "checkpoint.db", 1);
    let first = run_scrape(config.clone(), "hash", options(&server))
        .await
        .unwrap();
    assert!(first.listing_state.is_some());

    let second = run_scrape(config, "hash", options(&server)).await.unwrap();
    assert_eq!(second.listing_state, None);
    assert_eq!(second.products, 1);
}

#[tokio::test]
async fn test_fresh_run_clears_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "1", listing_page(&["P1"]), 2).await;
    Mock::given(method("GET"))
        .and(path("/r/item/P1"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_page(&["Good"])))
        .expect(2)
        .mount(&server)
        .await;

    let config = create_test_config(dir.path(), "checkpoint.db", 1);
    run_scrape(config.clone(), "hash", options(&server))
        .await
        .unwrap();

    let fresh = RunOptions {
        fresh: true,
        ..options(&server)
    };
    let mut coordinator = Coordinator::new(config, "hash", fresh).unwrap();
    assert_eq!(coordinator.site(), Site::Iherb);
    let summary = coordinator.run().await.unwrap();
    assert_eq!(summary.listing_state, Some(PaginationState::Done));
}

#[tokio::test]
async fn test_export_columns_and_values() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "1", listing_page(&["P1"]), 1).await;
    mount_reviews(&server, "P1", "1", review_page(&["Love it", "Great"])).await;
    mount_reviews(&server, "P1", "2", review_page(&[])).await;

    let config = create_test_config(dir.path(), "checkpoint.db", 1);
    run_scrape(config, "hash", options(&server)).await.unwrap();

    let mut reader = csv::Reader::from_path(dir.path().join("export.csv")).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec![
            "Product ID",
            "Product Name",
            "Product Link",
            "Price",
            "Rating",
            "Label",
            "Summary Sentiment",
            "Sentiment Score",
            "Reviews",
            "Review Dates",
            "Review Stars"
        ]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    let row = &rows[0];
    assert_eq!(&row[1], "Product P1");
    assert_eq!(&row[2], format!("{}/pr/item/P1", server.uri()));
    assert_eq!(&row[3], "$12.50");
    assert_eq!(&row[4], "4.6/5");
    assert_eq!(&row[5], "5");
    assert_ne!(&row[6], SentimentLabel::NoReviews.as_str());
    assert!(row[7].parse::<f64>().unwrap() > 0.0);
    assert_eq!(&row[8], r#"["Love it","Great"]"#);
    assert_eq!(&row[9], r#"["2024-03-03","2024-03-03"]"#);
}

#[tokio::test]
async fn test_unsupported_site_is_rejected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path(), "checkpoint.db", 1);
    config.scraper.site = None;

    let result = Coordinator::new(config, "hash", options(&server));
    assert!(matches!(
        result,
        Err(shelf_sentiment::ShelfError::UnsupportedSite(_))
    ));
}

#[tokio::test]
async fn test_larger_page_count_walks_listing_again() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "1", listing_page(&["P1"]), 2).await;
    mount_listing(&server, "2", listing_page(&["P2"]), 1).await;
    mount_reviews(&server, "P1", "1", review_page(&["Good"])).await;
    mount_reviews(&server, "P2", "1", review_page(&["Fine"])).await;

    let config = create_test_config(dir.path(), "checkpoint.db", 1);
    let first = run_scrape(config.clone(), "hash", options(&server))
        .await
        .unwrap();
    assert_eq!(first.products, 1);

    let more_pages = RunOptions {
        listing_pages: Some(2),
        ..options(&server)
    };
    let second = run_scrape(config, "hash", more_pages).await.unwrap();
    assert!(second.listing_state.is_some());
    assert_eq!(second.products, 2);
}

#[cfg(not(feature = "chromium"))]
#[tokio::test]
async fn test_session_failure_after_listing_writes_partial_products() {
    use shelf_sentiment::config::SessionKind;

    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "1", listing_page(&["P1", "P2"]), 1).await;

    let mut config = create_test_config(dir.path(), "checkpoint.db", 1);
    config.scraper.session = SessionKind::Chromium;

    let result = run_scrape(config, "hash", options(&server)).await;
    assert!(result.is_err());

    let rows = read_export(&dir.path().join("partial.csv"));
    let ids: Vec<&str> = rows.iter().map(|r| &r[0]).collect();
    assert_eq!(ids, vec!["P1", "P2"]);
    assert!(!dir.path().join("export.csv").exists());
    assert_eq!(
        latest_run_status(&dir.path().join("checkpoint.db")),
        RunStatus::Failed
    );
}

#[tokio::test]
async fn test_review_failure_writes_partial_records() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "1", listing_page(&["P1", "P2"]), 1).await;
    mount_reviews(&server, "P1", "1", review_page(&["Good"])).await;

    let config = create_test_config(dir.path(), "checkpoint.db", 1);
    let coordinator = Coordinator::new(config, "hash", options(&server)).unwrap();
    let mut coordinator = coordinator.with_sessions(Box::new(FailsAfterFirstOpen::new()));

    let result = coordinator.run().await;
    assert!(matches!(
        result,
        Err(shelf_sentiment::ShelfError::Session(SessionError::Open(_)))
    ));

    // Only the product enriched before the failure is written
    let rows = read_export(&dir.path().join("partial.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "P1");
    assert_eq!(&rows[0][8], r#"["Good"]"#);
    assert!(!dir.path().join("export.csv").exists());

    let checkpoint = dir.path().join("checkpoint.db");
    assert_eq!(latest_run_status(&checkpoint), RunStatus::Failed);
    let mut store = SqliteCheckpointStore::new(&checkpoint).unwrap();
    assert_eq!(store.load().unwrap(), 1);
    assert!(store.has("P1"));
}
