//! Shelf-Sentiment main entry point
//!
//! This is the command-line interface for the Shelf-Sentiment review harvester.

use anyhow::{bail, Context};
use clap::Parser;
use shelf_sentiment::config::{load_config_with_hash, Config};
use shelf_sentiment::crawler::{resolve_site, run_scrape, RunOptions};
use shelf_sentiment::url::{parse_listing_url, Site};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shelf-Sentiment: product listing and review harvester
///
/// Shelf-Sentiment reads product listings from Amazon search results or
/// iHerb category pages, collects each product's customer reviews, scores
/// them for sentiment, and exports everything as CSV. Interrupted runs pick
/// up where they stopped.
#[derive(Parser, Debug)]
#[command(name = "shelf-sentiment")]
#[command(version = "1.0.0")]
#[command(about = "Product listing and review sentiment harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Listing URL to scrape (Amazon search or iHerb category page)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Number of listing pages to read (overrides the config)
    #[arg(long, value_name = "N")]
    pages: Option<u32>,

    /// Number of review pages to read per product (overrides the config)
    #[arg(long, value_name = "M")]
    review_pages: Option<u32>,

    /// Site layout to use instead of inferring it from the URL
    #[arg(long, value_parser = parse_site)]
    site: Option<Site>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start over, discarding the checkpoint and cached listing
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

fn parse_site(s: &str) -> Result<Site, String> {
    Site::parse(s).ok_or_else(|| format!("unknown site '{}', expected amazon or iherb", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.stats {
        return handle_stats(&config);
    }

    let Some(url) = cli.url.clone() else {
        bail!("--url is required unless --stats is given");
    };

    let options = RunOptions {
        url,
        site: cli.site,
        listing_pages: cli.pages,
        review_pages: cli.review_pages,
        fresh: cli.fresh,
    };

    if cli.dry_run {
        handle_dry_run(&config, &options)
    } else {
        handle_scrape(config, &config_hash, options).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_sentiment=info,warn"),
            1 => EnvFilter::new("shelf_sentiment=debug,info"),
            2 => EnvFilter::new("shelf_sentiment=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates inputs and shows the plan
fn handle_dry_run(config: &Config, options: &RunOptions) -> anyhow::Result<()> {
    let url = parse_listing_url(&options.url)?;
    let site = resolve_site(&url, options.site, &config.scraper)?;
    let scraper = &config.scraper;

    println!("=== Shelf-Sentiment Dry Run ===\n");

    println!("Listing:");
    println!("  URL: {}", url);
    println!("  Site: {}", site);
    println!(
        "  Listing pages: {}",
        options.listing_pages.unwrap_or(scraper.listing_pages)
    );
    println!(
        "  Review pages per product: {}",
        options.review_pages.unwrap_or(scraper.review_pages)
    );

    println!("\nScraper Configuration:");
    println!("  Session: {:?}", scraper.session);
    println!("  Max concurrent pages: {}", scraper.max_concurrent_pages);
    println!("  Request timeout: {}ms", scraper.request_timeout_ms);
    println!(
        "  Page delay: {}-{}ms",
        scraper.page_delay_min_ms, scraper.page_delay_max_ms
    );
    println!(
        "  Retry: {} attempts, base {}, unit {}ms, statuses {:?}",
        config.retry.max_attempts,
        config.retry.backoff_base,
        config.retry.backoff_unit_ms,
        config.retry.retryable_statuses
    );
    println!("  User agents: {}", config.user_agents.pool.len());

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Export: {}", config.output.export_path);
    println!("  Partial: {}", config.output.partial_path);

    match &config.sentiment.lexicon_path {
        Some(path) => println!("\nSentiment lexicon: {}", path),
        None => println!("\nSentiment lexicon: built-in"),
    }

    println!("\n✓ Configuration is valid");
    if options.fresh {
        println!("✓ Would clear the checkpoint before starting");
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the checkpoint
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use shelf_sentiment::output::{load_statistics, print_statistics};
    use shelf_sentiment::storage::open_store;

    let path = Path::new(&config.output.checkpoint_path);
    println!("Checkpoint: {}\n", path.display());

    let mut store = open_store(path)
        .with_context(|| format!("failed to open checkpoint {}", path.display()))?;
    store.load()?;

    let stats = load_statistics(&*store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(config: Config, config_hash: &str, options: RunOptions) -> anyhow::Result<()> {
    if options.fresh {
        tracing::info!("Starting fresh scrape (ignoring previous state)");
    } else {
        tracing::info!("Starting scrape (will resume from the checkpoint if present)");
    }

    match run_scrape(config, config_hash, options).await {
        Ok(summary) => {
            tracing::info!(
                "Scrape completed: {} products, {} reviews",
                summary.products,
                summary.reviews
            );
            println!("✓ Export written to: {}", summary.export_path.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}
