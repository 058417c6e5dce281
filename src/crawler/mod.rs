//! Crawler module for fetching and processing listings
//!
//! This module contains the core crawling logic, including:
//! - Page fetching with placeholder retries and rate limiting
//! - Chunked fan-out of categories and products
//! - Product chunk sizing from available memory
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod governor;
mod retry;
mod scheduler;

pub use coordinator::{Coordinator, CATEGORY_COLUMN, PRODUCT_URL_COLUMN};
pub use fetcher::{
    build_http_client, ContentFetcher, FetchError, FetchResult, FetchStrategy, HttpFetcher,
    RateLimiter,
};
pub use governor::{adjust_chunk_size, ConcurrencyGovernor, FixedGovernor, MemoryGovernor};
pub use retry::{retry, RetryError};
pub use scheduler::{chunk_ranges, run_chunked, select_category_range, ChunkRun};

use crate::config::{Config, RunOptions};
use crate::output::{RunReport, StatsSnapshot};
use crate::site::default_registry;
use crate::storage::RunLayout;
use crate::{OrFatal, Result};
use chrono::Local;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the site engine named in the config
/// 2. Prepare the run directories for the run date
/// 3. Copy the nearest prior run forward when resuming
/// 4. Crawl the categories, or the custom URLs when any were given
/// 5. Append a report for the run
///
/// # Arguments
///
/// * `config` - The validated crawler configuration
/// * `options` - Run date and command-line switches
/// * `config_hash` - Hash of the config file, recorded in the report
///
/// # Returns
///
/// * `Ok(StatsSnapshot)` - Crawl completed; the final counters
/// * `Err(CrawlError)` - Crawl failed
pub async fn crawl(config: Config, options: RunOptions, config_hash: &str) -> Result<StatsSnapshot> {
    let started_at = Local::now();
    let site = default_registry().build(&config)?;

    let layout = RunLayout::from_config(&config);
    layout
        .initialize(&options.date, options.reset)
        .or_fatal("Failed to create run directories")?;

    let resumed_from = if !options.resume {
        None
    } else if !options.urls.is_empty() {
        tracing::info!("Custom URLs are crawled without resuming");
        None
    } else {
        crate::resume::resume(&layout, &options.date, Local::now().date_naive())
            .or_fatal("Failed to resume from a previous run")?
    };

    let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
    let config = Arc::new(config);
    let coordinator = Coordinator::new(Arc::clone(&config), options.clone(), site, fetcher);

    let result = coordinator.run().await;

    let stats = coordinator.stats().snapshot();
    stats.log_summary();

    let report = RunReport {
        site: config.site.name.clone(),
        date: options.date.clone(),
        started_at,
        finished_at: Local::now(),
        config_hash: config_hash.to_string(),
        resumed_from,
        error: result.as_ref().err().map(ToString::to_string),
        stats: stats.clone(),
    };
    if let Err(e) = report.append_to(&layout.reports_dir()).await {
        tracing::warn!("Failed to write run report: {}", e);
    }

    result.map(|_| stats)
}
