//! Listing-Crawler main entry point
//!
//! This is the command-line interface for the Listing-Crawler product crawler.

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use listing_crawler::config::{
    load_config_with_hash, parse_run_date, parse_url_list, Config, ConfigOverrides,
};
use listing_crawler::crawler::{crawl, Coordinator, HttpFetcher};
use listing_crawler::site::default_registry;
use listing_crawler::RunOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Listing-Crawler: a resumable crawler for paginated product listings
///
/// Listing-Crawler walks a site's category listings page by page, extracts
/// one row per product option and checkpoints its progress so an interrupted
/// run can be picked up again.
#[derive(Parser, Debug)]
#[command(name = "listing-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A resumable crawler for paginated product listings", long_about = None)]
struct Cli {
    /// Path to the site's TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run date (YYYYMMDD), defaults to today
    #[arg(long)]
    date: Option<String>,

    /// First category to crawl (inclusive)
    #[arg(long)]
    start_category: Option<String>,

    /// Last category to crawl (inclusive)
    #[arg(long)]
    end_category: Option<String>,

    /// Number of categories crawled concurrently
    #[arg(long)]
    categories_chunk_size: Option<usize>,

    /// Fixed number of products crawled concurrently
    #[arg(long)]
    products_chunk_size: Option<usize>,

    /// Delete the run date's temp, state and HTML directories first
    #[arg(long)]
    reset: bool,

    /// Copy the nearest previous run forward before crawling
    #[arg(long)]
    resume: bool,

    /// Crawl only the product URLs listed in FILE
    #[arg(long, value_name = "FILE")]
    urls: Option<PathBuf>,

    /// Validate config and list the categories that would be crawled
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let date = match &cli.date {
        Some(date) => date.clone(),
        None => Local::now().format("%Y%m%d").to_string(),
    };
    parse_run_date(&date)?;

    let overrides = ConfigOverrides {
        start_category: cli.start_category.clone(),
        end_category: cli.end_category.clone(),
        categories_chunk_size: cli.categories_chunk_size,
        products_chunk_size: cli.products_chunk_size,
    };

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config, &overrides) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let mut options = RunOptions::new(date);
    options.reset = cli.reset;
    options.resume = cli.resume;
    if let Some(path) = &cli.urls {
        options.urls = read_urls(path)?;
        tracing::info!("Loaded {} custom URLs from {}", options.urls.len(), path.display());
    }

    if cli.dry_run {
        handle_dry_run(config, options).await
    } else {
        handle_crawl(config, options, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_crawler=info,warn"),
            1 => EnvFilter::new("listing_crawler=debug,info"),
            2 => EnvFilter::new("listing_crawler=trace,debug"),
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

/// Reads the custom URL file
fn read_urls(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL file {}", path.display()))?;
    Ok(parse_url_list(&content))
}

/// Handles the --dry-run mode: validates config and lists the selected categories
async fn handle_dry_run(config: Config, options: RunOptions) -> anyhow::Result<()> {
    println!("=== Listing-Crawler Dry Run ===\n");

    println!("Site: {} (engine '{}')", config.site.name, config.site.engine);
    println!("Run date: {}", options.date);
    println!("\nCrawler Configuration:");
    println!(
        "  Categories chunk size: {}",
        config.crawler.categories_chunk_size
    );
    println!(
        "  Products chunk size: {} to {}{}",
        config.crawler.min_products_chunk_size,
        config.crawler.max_products_chunk_size,
        if config.crawler.adaptive_chunking {
            " (adaptive)"
        } else {
            ""
        }
    );
    println!("  Output: {}", config.output.base_dir.display());

    if !options.urls.is_empty() {
        println!("\nCustom URLs ({}):", options.urls.len());
        for url in &options.urls {
            println!("  - {}", url);
        }
        return Ok(());
    }

    let site = default_registry().build(&config)?;
    let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
    let coordinator = Coordinator::new(Arc::new(config), options, site, fetcher);
    let categories = coordinator.selected_categories().await?;

    println!("\nCategories ({}):", categories.len());
    for category in &categories {
        println!("  - {} ({})", category.name, category.url);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, options: RunOptions, config_hash: &str) -> anyhow::Result<()> {
    if options.reset {
        tracing::info!("Starting fresh crawl for {}", options.date);
    }

    match crawl(config, options, config_hash).await {
        Ok(stats) => {
            tracing::info!(
                "Crawl completed successfully ({} rows written)",
                stats.rows_written
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
