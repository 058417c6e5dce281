//! Counters collected while a run is in progress
//!
//! Category and product work items run concurrently, so the counters are
//! atomics shared through the coordinator. A snapshot is taken at the end of
//! the run for the log summary and the run report.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live crawl counters
#[derive(Debug, Default)]
pub struct CrawlStats {
    categories_crawled: AtomicU64,
    categories_skipped: AtomicU64,
    categories_failed: AtomicU64,
    pages_crawled: AtomicU64,
    products_extracted: AtomicU64,
    products_skipped: AtomicU64,
    products_failed: AtomicU64,
    rows_written: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub categories_crawled: u64,
    pub categories_skipped: u64,
    pub categories_failed: u64,
    pub pages_crawled: u64,
    pub products_extracted: u64,
    pub products_skipped: u64,
    pub products_failed: u64,
    pub rows_written: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category_crawled(&self) {
        self.categories_crawled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn category_skipped(&self) {
        self.categories_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn category_failed(&self) {
        self.categories_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_crawled(&self) {
        self.pages_crawled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn product_extracted(&self, rows: usize) {
        self.products_extracted.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn product_skipped(&self) {
        self.products_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn product_failed(&self) {
        self.products_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            categories_crawled: self.categories_crawled.load(Ordering::Relaxed),
            categories_skipped: self.categories_skipped.load(Ordering::Relaxed),
            categories_failed: self.categories_failed.load(Ordering::Relaxed),
            pages_crawled: self.pages_crawled.load(Ordering::Relaxed),
            products_extracted: self.products_extracted.load(Ordering::Relaxed),
            products_skipped: self.products_skipped.load(Ordering::Relaxed),
            products_failed: self.products_failed.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Products that were visited this run, whether or not they succeeded
    pub fn products_attempted(&self) -> u64 {
        self.products_extracted + self.products_failed
    }

    /// Share of attempted products that produced rows, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.products_attempted();
        if attempted == 0 {
            return 0.0;
        }
        (self.products_extracted as f64 / attempted as f64) * 100.0
    }

    /// Writes the counters to the log
    pub fn log_summary(&self) {
        tracing::info!(
            "Categories: {} crawled, {} already done, {} failed",
            self.categories_crawled,
            self.categories_skipped,
            self.categories_failed
        );
        tracing::info!(
            "Products: {} extracted, {} already done, {} failed ({:.1}% success) over {} pages",
            self.products_extracted,
            self.products_skipped,
            self.products_failed,
            self.success_rate(),
            self.pages_crawled
        );
        tracing::info!("Rows written: {}", self.rows_written);
    }
}
