//! Listing-Crawler: a resumable crawler for paginated product listings
//!
//! This crate walks the category listings of independently configured sites,
//! extracts one row per product (or product option) and appends the rows to
//! per-page intermediate files. Progress is checkpointed per category and per
//! product on the filesystem so that an interrupted run, or the next day's run,
//! picks up where the previous one stopped.

pub mod config;
pub mod crawler;
pub mod output;
pub mod result;
pub mod resume;
pub mod site;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Listing-Crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] state::CheckpointError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction failed for {url}: {source}")]
    Extract {
        url: String,
        source: site::ExtractError,
    },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("No site engine registered as '{0}'")]
    UnknownSite(String),

    #[error("{failed} of {total} work items failed in {scope}")]
    ItemsFailed {
        scope: String,
        failed: usize,
        total: usize,
    },

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid run date '{0}', expected YYYYMMDD")]
    InvalidDate(String),
}

/// Result type alias for Listing-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, RunOptions};
pub use crawler::{crawl, Coordinator};
pub use result::OrFatal;
pub use state::{CategoryState, CheckpointStore, ProductState};
pub use storage::RunLayout;
