use crate::config::types::{Config, CrawlerConfig, FetcherConfig, OutputConfig, SelectorConfig, SiteConfig};
use crate::ConfigError;
use chrono::NaiveDate;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    if let Some(selectors) = &config.selectors {
        validate_selector_config(selectors)?;
    }
    Ok(())
}

/// Parses a run date in `YYYYMMDD` form
pub fn parse_run_date(date: &str) -> Result<NaiveDate, ConfigError> {
    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| ConfigError::InvalidDate(date.to_string()))
}

/// Validates site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    // The site name becomes a directory name
    if config.name.is_empty() {
        return Err(ConfigError::Validation("site name cannot be empty".to_string()));
    }

    if !config
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site name must contain only alphanumeric characters, '-' and '_', got '{}'",
            config.name
        )));
    }

    if config.engine.is_empty() {
        return Err(ConfigError::Validation("site engine cannot be empty".to_string()));
    }

    if config.categories_file.is_empty() {
        return Err(ConfigError::Validation(
            "categories_file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.categories_chunk_size < 1 {
        return Err(ConfigError::Validation(format!(
            "categories_chunk_size must be >= 1, got {}",
            config.categories_chunk_size
        )));
    }

    if config.min_products_chunk_size < 1 {
        return Err(ConfigError::Validation(format!(
            "min_products_chunk_size must be >= 1, got {}",
            config.min_products_chunk_size
        )));
    }

    if config.max_products_chunk_size < config.min_products_chunk_size {
        return Err(ConfigError::Validation(format!(
            "max_products_chunk_size ({}) must be >= min_products_chunk_size ({})",
            config.max_products_chunk_size, config.min_products_chunk_size
        )));
    }

    if config.adaptive_chunking && config.page_memory_mb == 0 {
        return Err(ConfigError::Validation(
            "page_memory_mb must be > 0 when adaptive_chunking is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation("user_agent cannot be empty".to_string()));
    }

    if config.rate_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "rate_limit must be >= 1 request per second, got {}",
            config.rate_limit
        )));
    }

    if config.max_tries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_tries must be >= 1, got {}",
            config.max_tries
        )));
    }

    if config.request_timeout < 100 || config.async_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 100ms, got request={}ms async={}ms",
            config.request_timeout, config.async_timeout
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.base_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("base_dir cannot be empty".to_string()));
    }

    for (idx, column) in config.columns.iter().enumerate() {
        if column.is_empty() {
            return Err(ConfigError::Validation(format!("column #{} is empty", idx + 1)));
        }
        if config.columns[..idx].contains(column) {
            return Err(ConfigError::Validation(format!(
                "column '{}' is listed twice",
                column
            )));
        }
    }

    Ok(())
}

/// Validates the selector engine configuration
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    validate_selector(&config.products)?;
    for selector in config.fields.values() {
        validate_selector(selector)?;
    }
    if let Some(options) = &config.options {
        validate_selector(options)?;
    }

    let pattern = Regex::new(&config.product_id_pattern).map_err(|e| {
        ConfigError::Validation(format!(
            "Invalid product_id_pattern '{}': {}",
            config.product_id_pattern, e
        ))
    })?;
    if pattern.captures_len() < 2 {
        return Err(ConfigError::Validation(format!(
            "product_id_pattern '{}' must contain a capture group",
            config.product_id_pattern
        )));
    }

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation("page_param cannot be empty".to_string()));
    }

    match (&config.categories_url, &config.category_links) {
        (Some(url), Some(links)) => {
            Url::parse(url).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid categories_url '{}': {}", url, e))
            })?;
            validate_selector(links)?;
        }
        (None, None) => {}
        _ => {
            return Err(ConfigError::Validation(
                "categories_url and category_links must be set together".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    parse_selector(selector).map(|_| ())
}

/// Parses a CSS selector, reporting failures as config errors
pub fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
