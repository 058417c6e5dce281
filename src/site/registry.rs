//! Registry of site engines
//!
//! The `[site] engine` key names the engine; the registry maps that name to a
//! constructor when the run starts. An unknown name stops the run before any
//! crawling.

use crate::config::Config;
use crate::site::{
    CategorySource, FileCategorySource, PageCategorySource, SelectorExtractor, SiteModule,
};
use crate::storage::RunLayout;
use crate::{ConfigError, CrawlError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a site engine from the run configuration
pub type SiteConstructor = fn(&Config) -> crate::Result<SiteModule>;

/// Engine name to constructor mapping
#[derive(Clone, Default)]
pub struct SiteRegistry {
    engines: BTreeMap<String, SiteConstructor>,
}

impl SiteRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `engine`, replacing any earlier entry
    pub fn register(&mut self, engine: &str, constructor: SiteConstructor) -> &mut Self {
        self.engines.insert(engine.to_string(), constructor);
        self
    }

    pub fn contains(&self, engine: &str) -> bool {
        self.engines.contains_key(engine)
    }

    /// Registered engine names in sorted order
    pub fn engines(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    /// Builds the engine the config asks for
    pub fn build(&self, config: &Config) -> crate::Result<SiteModule> {
        let engine = config.site.engine.as_str();
        let constructor = self
            .engines
            .get(engine)
            .ok_or_else(|| CrawlError::UnknownSite(engine.to_string()))?;

        tracing::debug!("Building site engine '{}' for {}", engine, config.site.name);
        constructor(config)
    }
}

/// Registry with every engine shipped in this crate
pub fn default_registry() -> SiteRegistry {
    let mut registry = SiteRegistry::new();
    registry.register("selector", build_selector_site);
    registry
}

fn build_selector_site(config: &Config) -> crate::Result<SiteModule> {
    let selectors = config.selectors.as_ref().ok_or_else(|| {
        ConfigError::Validation("engine 'selector' needs a [selectors] section".to_string())
    })?;

    let categories: Arc<dyn CategorySource> =
        match (&selectors.categories_url, &selectors.category_links) {
            (Some(url), Some(links)) => Arc::new(PageCategorySource::new(url, links)?),
            _ => {
                let layout = RunLayout::from_config(config);
                Arc::new(FileCategorySource::new(
                    layout.site_file(&config.site.categories_file),
                ))
            }
        };

    Ok(SiteModule {
        categories,
        extractor: Arc::new(SelectorExtractor::new(selectors)?),
    })
}
