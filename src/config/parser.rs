use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub start_category: Option<String>,
    pub end_category: Option<String>,
    pub categories_chunk_size: Option<usize>,
    /// Sets both the starting and the maximum product chunk size
    pub products_chunk_size: Option<usize>,
}

impl ConfigOverrides {
    /// Applies the overrides to a parsed configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(start) = &self.start_category {
            config.site.start_category = Some(start.clone());
        }
        if let Some(end) = &self.end_category {
            config.site.end_category = Some(end.clone());
        }
        if let Some(size) = self.categories_chunk_size {
            config.crawler.categories_chunk_size = size;
        }
        if let Some(size) = self.products_chunk_size {
            config.crawler.min_products_chunk_size = size;
            config.crawler.max_products_chunk_size = size;
        }
    }
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use listing_crawler::config::load_config;
///
/// let config = load_config(Path::new("volvik.toml")).unwrap();
/// println!("Categories per chunk: {}", config.crawler.categories_chunk_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_overrides(path, &ConfigOverrides::default())
}

/// Loads a configuration, applies command-line overrides, then validates it
pub fn load_config_with_overrides(
    path: &Path,
    overrides: &ConfigOverrides,
) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    overrides.apply(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded in the run report so runs made with different
/// settings can be told apart.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(
    path: &Path,
    overrides: &ConfigOverrides,
) -> Result<(Config, String), ConfigError> {
    let config = load_config_with_overrides(path, overrides)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Parses a custom URL list
///
/// Entries are separated by any whitespace and may be wrapped in single or
/// double quotes. Entries without `http` are ignored; repeats keep their first
/// position.
pub fn parse_url_list(content: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for entry in content.split_whitespace() {
        let url = entry.trim_matches(|c| c == '"' || c == '\'');
        if url.contains("http") && !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}
