//! Product chunk sizing
//!
//! Every in-flight product holds a fetched page in memory, and the number of
//! in-flight products is `categories_chunk * products_chunk`. The governor is
//! asked for a product chunk size once per category page.

use crate::config::CrawlerConfig;
use std::sync::Mutex;
use sysinfo::System;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Decides how many products of a page are processed concurrently
pub trait ConcurrencyGovernor: Send + Sync {
    /// Returns the product chunk size for the next page, within `[1, max]`
    fn next_chunk_size(&self, categories_chunk: usize, products_chunk: usize) -> usize;
}

/// Always uses the configured maximum chunk size
#[derive(Debug, Clone)]
pub struct FixedGovernor {
    max: usize,
}

impl FixedGovernor {
    pub fn new(max: usize) -> Self {
        Self { max: max.max(1) }
    }
}

impl ConcurrencyGovernor for FixedGovernor {
    fn next_chunk_size(&self, _categories_chunk: usize, _products_chunk: usize) -> usize {
        self.max
    }
}

/// Sizes product chunks from the memory currently available
pub struct MemoryGovernor {
    system: Mutex<System>,
    page_memory_mb: u64,
    reserved_memory_mb: u64,
    max: usize,
}

impl MemoryGovernor {
    pub fn new(page_memory_mb: u64, reserved_memory_mb: u64, max: usize) -> Self {
        Self {
            system: Mutex::new(System::new()),
            page_memory_mb: page_memory_mb.max(1),
            reserved_memory_mb,
            max: max.max(1),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.page_memory_mb,
            config.reserved_memory_mb,
            config.max_products_chunk_size,
        )
    }

    fn available_mb(&self) -> u64 {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_memory();
        system.available_memory() / BYTES_PER_MB
    }
}

impl ConcurrencyGovernor for MemoryGovernor {
    fn next_chunk_size(&self, categories_chunk: usize, products_chunk: usize) -> usize {
        let available = self.available_mb();
        let size = adjust_chunk_size(
            available,
            self.reserved_memory_mb,
            self.page_memory_mb,
            categories_chunk,
            self.max,
        );

        if size != products_chunk {
            tracing::info!(
                "Product chunk size {} -> {} ({} MB available, {} categories in flight)",
                products_chunk,
                size,
                available,
                categories_chunk
            );
        }
        size
    }
}

/// Largest product chunk whose pages fit in the memory left after the reserve
///
/// The result is clamped to `[1, max]`, so an exhausted budget still makes
/// progress one product at a time.
pub fn adjust_chunk_size(
    available_mb: u64,
    reserved_mb: u64,
    page_memory_mb: u64,
    categories_chunk: usize,
    max: usize,
) -> usize {
    let budget = available_mb.saturating_sub(reserved_mb);
    let per_product = page_memory_mb.max(1) * categories_chunk.max(1) as u64;
    let fit = usize::try_from(budget / per_product).unwrap_or(usize::MAX);
    fit.clamp(1, max.max(1))
}
