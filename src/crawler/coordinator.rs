//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates a run, including:
//! - Selecting the categories to crawl and fanning them out in chunks
//! - Paging through each category until a page lists no products
//! - Fanning the products of a page out in chunks sized by the governor
//! - Skipping finished work through category and product checkpoints
//! - Appending extracted rows to the page's intermediate file

use crate::config::{Config, FailurePolicy, RunOptions};
use crate::crawler::governor::{ConcurrencyGovernor, FixedGovernor, MemoryGovernor};
use crate::crawler::scheduler::{run_chunked, select_category_range};
use crate::crawler::{ContentFetcher, FetchStrategy};
use crate::output::{CrawlStats, CsvRowWriter, Row, RowWriter};
use crate::site::{Category, ProductLink, SiteModule};
use crate::state::CheckpointStore;
use crate::storage::{HtmlCache, HtmlPage, RunLayout};
use crate::{CrawlError, OrFatal, Result};
use std::path::Path;
use std::sync::Arc;

/// Column holding the category name in every row
pub const CATEGORY_COLUMN: &str = "category";

/// Column holding the product page URL in every row
pub const PRODUCT_URL_COLUMN: &str = "product_url";

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    options: RunOptions,
    site: SiteModule,
    fetcher: Arc<dyn ContentFetcher>,
    writer: Arc<dyn RowWriter>,
    governor: Arc<dyn ConcurrencyGovernor>,
    store: CheckpointStore,
    layout: RunLayout,
    html: Option<HtmlCache>,
    stats: CrawlStats,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Rows go to CSV files with the configured columns, and product chunks are
    /// sized from available memory when `adaptive-chunking` is on.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawler configuration
    /// * `options` - Run date and command-line switches
    /// * `site` - The site engine
    /// * `fetcher` - Source of page content
    pub fn new(
        config: Arc<Config>,
        options: RunOptions,
        site: SiteModule,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        let writer: Arc<dyn RowWriter> = Arc::new(CsvRowWriter::new(config.output.columns.clone()));
        let governor: Arc<dyn ConcurrencyGovernor> = if config.crawler.adaptive_chunking {
            Arc::new(MemoryGovernor::from_config(&config.crawler))
        } else {
            Arc::new(FixedGovernor::new(config.crawler.max_products_chunk_size))
        };
        let layout = RunLayout::from_config(&config);
        let html = config
            .crawler
            .save_html
            .then(|| HtmlCache::new(layout.html_root()));

        Self {
            store: CheckpointStore::from_config(&config),
            layout,
            html,
            config,
            options,
            site,
            fetcher,
            writer,
            governor,
            stats: CrawlStats::new(),
        }
    }

    /// Replaces the row writer
    pub fn with_writer(mut self, writer: Arc<dyn RowWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Replaces the product chunk governor
    pub fn with_governor(mut self, governor: Arc<dyn ConcurrencyGovernor>) -> Self {
        self.governor = governor;
        self
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Crawls the custom URLs if any were given, otherwise the categories
    pub async fn run(&self) -> Result<()> {
        if self.options.urls.is_empty() {
            self.crawl_categories().await
        } else {
            self.crawl_urls().await
        }
    }

    /// The categories this run covers, after applying the configured range
    pub async fn selected_categories(&self) -> Result<Vec<Category>> {
        let categories = self.site.categories.categories(self.fetcher.as_ref()).await?;
        let selected = select_category_range(
            &categories,
            self.config.site.start_category.as_deref(),
            self.config.site.end_category.as_deref(),
        );
        Ok(selected.to_vec())
    }

    /// Crawls every selected category, a chunk of categories at a time
    pub async fn crawl_categories(&self) -> Result<()> {
        let categories = self.selected_categories().await?;
        tracing::info!(
            "Crawling {} categories of {} on {}",
            categories.len(),
            self.config.site.name,
            self.options.date
        );

        let policy = self.config.crawler.on_failure;
        let run = run_chunked(
            categories.len(),
            self.config.crawler.categories_chunk_size,
            |index| self.crawl_category(&categories[index]),
            policy == FailurePolicy::Abort,
        )
        .await;

        for (index, error) in run.errors() {
            self.stats.category_failed();
            tracing::error!("Category {} failed: {}", categories[index].name, error);
        }

        let failed = run.failed();
        if failed == 0 {
            tracing::info!("All categories crawled");
            return Ok(());
        }

        match policy {
            FailurePolicy::Abort => {
                if run.stopped_early {
                    tracing::error!("Stopping the run after a failed chunk of categories");
                }
                Err(run
                    .into_first_error()
                    .or_fatal("category chunk failed without an error")?)
            }
            FailurePolicy::Continue => {
                tracing::warn!("{} of {} categories failed", failed, categories.len());
                Ok(())
            }
        }
    }

    /// Pages through one category until a page lists no products
    ///
    /// The category checkpoint is saved after every completed page, so a failed
    /// page is crawled again by the next run.
    pub async fn crawl_category(&self, category: &Category) -> Result<()> {
        let date = self.options.date.as_str();
        let Some(mut state) = self.store.category_state(&category.name, date).await else {
            tracing::info!("Category {} is already crawled", category.name);
            self.stats.category_skipped();
            return Ok(());
        };

        tracing::info!(
            "Crawling category {} from page {}",
            category.name,
            state.page_number
        );

        let extractor = &self.site.extractor;
        let categories_chunk = self.config.crawler.categories_chunk_size;
        let mut products_chunk = self.config.crawler.min_products_chunk_size;

        loop {
            let page = state.page_number;
            let page_url = extractor.page_url(&category.url, page);
            let content = self
                .cached_fetch(
                    HtmlPage::Category {
                        category: &category.name,
                        page,
                    },
                    &page_url,
                    FetchStrategy::Fetch,
                )
                .await?;

            let links = extractor
                .listing(&content, &page_url)
                .map_err(|source| CrawlError::Extract {
                    url: page_url.clone(),
                    source,
                })?;

            if links.is_empty() {
                tracing::info!("No products on page {} of {}, category is done", page, category.name);
                break;
            }

            products_chunk = self.governor.next_chunk_size(categories_chunk, products_chunk);
            tracing::debug!(
                "{} products on page {} of {} (chunk size {})",
                links.len(),
                page,
                category.name,
                products_chunk
            );

            self.crawl_products(category, page, &links, products_chunk)
                .await?;
            self.stats.page_crawled();

            state.advance();
            self.store.save_category(&state).await?;
        }

        state.mark_done();
        self.store.save_category(&state).await?;
        self.stats.category_crawled();

        Ok(())
    }

    /// Processes the products of one listing page in chunks
    ///
    /// A chunk with a failed product ends the page: later chunks are not
    /// started and the page is reported as failed.
    async fn crawl_products(
        &self,
        category: &Category,
        page: u32,
        links: &[ProductLink],
        chunk_size: usize,
    ) -> Result<()> {
        let file = self
            .layout
            .temporary_csv_file(&self.options.date, &category.name, page);

        let run = run_chunked(
            links.len(),
            chunk_size,
            |index| self.crawl_product(category, page, &links[index], &file),
            true,
        )
        .await;

        let failed = run.failed();
        if failed == 0 {
            return Ok(());
        }

        for (index, error) in run.errors() {
            tracing::error!("Product {} failed: {}", links[index].url, error);
        }
        Err(CrawlError::ItemsFailed {
            scope: format!("{} page {}", category.name, page),
            failed,
            total: links.len(),
        })
    }

    /// Extracts one product unless its checkpoint says it is done
    ///
    /// The product checkpoint is marked done only after all of its rows are
    /// written.
    async fn crawl_product(
        &self,
        category: &Category,
        page: u32,
        link: &ProductLink,
        file: &Path,
    ) -> Result<()> {
        let date = self.options.date.as_str();
        let Some(mut state) = self.store.product_state(&link.id, &category.name, date).await else {
            tracing::debug!("Product {} is already extracted", link.id);
            self.stats.product_skipped();
            return Ok(());
        };

        let page_cache = HtmlPage::Product {
            category: &category.name,
            page,
            product_id: &link.id,
        };
        let written = match self.extract(link, Some(page_cache), Some(category.name.as_str()), file).await {
            Ok(written) => written,
            Err(e) => {
                self.stats.product_failed();
                return Err(e);
            }
        };

        state.mark_done();
        self.store.save_product(&state).await?;
        self.stats.product_extracted(written);

        Ok(())
    }

    /// Crawls the custom URLs in chunks of the maximum product chunk size
    ///
    /// No checkpoints are read or written; every URL is extracted again.
    pub async fn crawl_urls(&self) -> Result<()> {
        let file = self.layout.custom_urls_csv_file(&self.options.date);
        let extractor = &self.site.extractor;
        let links: Vec<ProductLink> = self
            .options
            .urls
            .iter()
            .map(|url| ProductLink {
                id: extractor.product_id(url).unwrap_or_else(|| url.clone()),
                url: url.clone(),
            })
            .collect();

        tracing::info!("Crawling {} custom URLs", links.len());

        let run = run_chunked(
            links.len(),
            self.config.crawler.max_products_chunk_size,
            |index| self.crawl_url(&links[index], &file),
            false,
        )
        .await;

        let failed = run.failed();
        if failed == 0 {
            return Ok(());
        }

        for (index, error) in run.errors() {
            tracing::error!("URL {} failed: {}", links[index].url, error);
        }
        Err(CrawlError::ItemsFailed {
            scope: "custom URLs".to_string(),
            failed,
            total: links.len(),
        })
    }

    async fn crawl_url(&self, link: &ProductLink, file: &Path) -> Result<()> {
        match self.extract(link, None, None, file).await {
            Ok(written) => {
                self.stats.product_extracted(written);
                Ok(())
            }
            Err(e) => {
                self.stats.product_failed();
                Err(e)
            }
        }
    }

    /// Fetches a product page, extracts its rows and appends them to `file`
    async fn extract(
        &self,
        link: &ProductLink,
        cache: Option<HtmlPage<'_>>,
        category: Option<&str>,
        file: &Path,
    ) -> Result<usize> {
        let strategy = self.site.extractor.product_strategy();
        let content = match cache {
            Some(page) => self.cached_fetch(page, &link.url, strategy).await?,
            None => self.fetcher.fetch(&link.url, strategy).await?,
        };

        let rows = self
            .site
            .extractor
            .product(&content, link)
            .map_err(|source| CrawlError::Extract {
                url: link.url.clone(),
                source,
            })?;

        for row in &rows {
            let row = decorate(row, category, &link.url);
            self.writer.append(file, &row).await?;
        }

        Ok(rows.len())
    }

    /// Reads a page from the HTML cache, fetching and caching it on a miss
    async fn cached_fetch(
        &self,
        page: HtmlPage<'_>,
        url: &str,
        strategy: FetchStrategy,
    ) -> Result<String> {
        let Some(cache) = &self.html else {
            return Ok(self.fetcher.fetch(url, strategy).await?);
        };

        let date = self.options.date.as_str();
        if let Some(content) = cache.read(date, &page).await {
            tracing::debug!("Using cached HTML for {}", url);
            return Ok(content);
        }

        let content = self.fetcher.fetch(url, strategy).await?;
        if let Err(e) = cache.write(date, &page, &content).await {
            tracing::warn!("Failed to cache HTML of {}: {}", url, e);
        }
        Ok(content)
    }
}

/// Adds the category and product URL columns to an extracted row
fn decorate(row: &Row, category: Option<&str>, product_url: &str) -> Row {
    let mut row = row.clone();
    if let Some(category) = category {
        row.set(CATEGORY_COLUMN, category);
    }
    row.set(PRODUCT_URL_COLUMN, product_url);
    row
}
