//! Configuration module for Listing-Crawler
//!
//! This module handles loading, parsing, and validating the per-site TOML
//! configuration. The parsed `Config` is immutable once validated and is handed
//! to the crawler explicitly; nothing in the crate reads settings from global
//! state.
//!
//! # Example
//!
//! ```no_run
//! use listing_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("volvik.toml")).unwrap();
//! println!("Crawling site: {}", config.site.name);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FailurePolicy, FetcherConfig, OutputConfig, RunOptions,
    SelectorConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_config_with_overrides,
    parse_url_list, ConfigOverrides,
};
pub use validation::{parse_run_date, parse_selector, validate};
