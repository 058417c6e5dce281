use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure for a site crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: Option<SelectorConfig>,
}

/// Which site is crawled and which slice of its categories
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site identifier, also the name of the site's run directory
    pub name: String,

    /// Registered site engine that provides categories and extraction
    #[serde(default = "default_engine")]
    pub engine: String,

    /// First page number of every category listing
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// First category of the slice to crawl (inclusive)
    #[serde(rename = "start-category", default)]
    pub start_category: Option<String>,

    /// Last category of the slice to crawl (inclusive)
    #[serde(rename = "end-category", default)]
    pub end_category: Option<String>,

    /// `name, url` list of categories, relative to the site directory
    #[serde(rename = "categories-file", default = "default_categories_file")]
    pub categories_file: String,
}

/// Fan-out and checkpoint behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of categories crawled concurrently
    #[serde(rename = "categories-chunk-size")]
    pub categories_chunk_size: usize,

    /// Product chunk size a category starts with
    #[serde(rename = "min-products-chunk-size")]
    pub min_products_chunk_size: usize,

    /// Upper bound for the product chunk size
    #[serde(rename = "max-products-chunk-size")]
    pub max_products_chunk_size: usize,

    #[serde(rename = "use-category-checkpoints", default = "default_true")]
    pub use_category_checkpoints: bool,

    #[serde(rename = "use-product-checkpoints", default = "default_true")]
    pub use_product_checkpoints: bool,

    /// Keep fetched listing and product pages under `html/<date>`
    #[serde(rename = "save-html", default)]
    pub save_html: bool,

    /// Resize product chunks from available memory
    #[serde(rename = "adaptive-chunking", default)]
    pub adaptive_chunking: bool,

    /// Estimated memory held by one in-flight product page (megabytes)
    #[serde(rename = "page-memory-mb", default = "default_page_memory_mb")]
    pub page_memory_mb: u64,

    /// Memory kept free for the rest of the system (megabytes)
    #[serde(rename = "reserved-memory-mb", default = "default_reserved_memory_mb")]
    pub reserved_memory_mb: u64,

    /// What happens after a chunk of categories contains a failure
    #[serde(rename = "on-failure", default)]
    pub on_failure: FailurePolicy,
}

/// Policy applied once a chunk has finished and some of its items failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop before the next chunk and report the failure
    #[default]
    Abort,
    /// Log the failure and keep going
    Continue,
}

/// HTTP transport behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum requests per second
    #[serde(rename = "rate-limit", default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Overall timeout for one fetch including retries (milliseconds)
    #[serde(rename = "async-timeout", default = "default_async_timeout")]
    pub async_timeout: u64,

    /// Attempts made while the body still looks like a placeholder
    #[serde(rename = "max-tries", default = "default_max_tries")]
    pub max_tries: u32,

    /// Pause between placeholder retries (milliseconds)
    #[serde(rename = "retry-delay", default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Marker text of a not-yet-rendered page
    #[serde(default)]
    pub placeholder: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            rate_limit: default_rate_limit(),
            request_timeout: default_request_timeout(),
            async_timeout: default_async_timeout(),
            max_tries: default_max_tries(),
            retry_delay: default_retry_delay(),
            placeholder: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding one run directory per site
    #[serde(rename = "base-dir")]
    pub base_dir: PathBuf,

    /// Column order of the intermediate files; empty keeps the row's order
    #[serde(default)]
    pub columns: Vec<String>,
}

/// CSS selectors for the config-driven site engine
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Product anchors on a category listing page
    pub products: String,

    /// Attribute of the product anchor holding the product URL
    #[serde(rename = "link-attribute", default = "default_link_attribute")]
    pub link_attribute: String,

    /// Regex with one capture group extracting the product id from its URL
    #[serde(rename = "product-id-pattern")]
    pub product_id_pattern: String,

    /// Query parameter carrying the page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Output column -> selector whose text fills the column
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    /// Selector of option elements; each match yields one row
    #[serde(default)]
    pub options: Option<String>,

    /// Page listing the categories, when there is no categories file
    #[serde(rename = "categories-url", default)]
    pub categories_url: Option<String>,

    /// Category anchors on `categories-url`
    #[serde(rename = "category-links", default)]
    pub category_links: Option<String>,
}

/// Per-run settings that come from the command line rather than the config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run date (`YYYYMMDD`) naming the dated directories
    pub date: String,

    /// Remove the current date's directories before crawling
    pub reset: bool,

    /// Copy the nearest prior run forward before crawling
    pub resume: bool,

    /// Crawl only these product URLs instead of the category listings
    pub urls: Vec<String>,
}

impl RunOptions {
    /// Creates options for a plain crawl on the given date
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            reset: false,
            resume: false,
            urls: Vec::new(),
        }
    }
}

fn default_engine() -> String {
    "selector".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_categories_file() -> String {
    "categories.txt".to_string()
}

fn default_true() -> bool {
    true
}

fn default_page_memory_mb() -> u64 {
    100
}

fn default_reserved_memory_mb() -> u64 {
    4000
}

fn default_user_agent() -> String {
    format!("listing-crawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_rate_limit() -> u32 {
    5
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_async_timeout() -> u64 {
    60_000
}

fn default_max_tries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    500
}

fn default_link_attribute() -> String {
    "href".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}
