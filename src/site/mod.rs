//! Site engines
//!
//! A site engine knows where a site's categories come from and how to read
//! its listing and product pages. The crawler only sees the two traits below;
//! engines are looked up by name in a [`SiteRegistry`] when the run starts.

mod categories;
mod registry;
mod selector;

pub use categories::{parse_categories, FileCategorySource};
pub use registry::{default_registry, SiteConstructor, SiteRegistry};
pub use selector::{PageCategorySource, SelectorExtractor};

use crate::crawler::{ContentFetcher, FetchStrategy};
use crate::output::Row;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while reading a fetched page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{description} (query: {query})")]
    QueryNotFound { description: String, query: String },

    #[error("Incorrect data: {0}")]
    IncorrectData(String),
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;

/// A top-level listing of a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub url: String,
}

impl Category {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A product found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLink {
    /// Site-unique product identifier, the key of its checkpoint
    pub id: String,
    pub url: String,
}

/// Provides the ordered categories of a site
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn categories(&self, fetcher: &dyn ContentFetcher) -> crate::Result<Vec<Category>>;
}

/// Reads listing and product pages of a site
pub trait Extractor: Send + Sync {
    /// URL of page `page` of a category listing
    fn page_url(&self, category_url: &str, page: u32) -> String;

    /// Products on a listing page; an empty list means the category is exhausted
    fn listing(&self, content: &str, page_url: &str) -> ExtractResult<Vec<ProductLink>>;

    /// Rows of one product, one per purchasable option
    fn product(&self, content: &str, link: &ProductLink) -> ExtractResult<Vec<Row>>;

    /// Product id encoded in a product URL, if the site has one
    fn product_id(&self, _url: &str) -> Option<String> {
        None
    }

    /// How product pages are retrieved
    fn product_strategy(&self) -> FetchStrategy {
        FetchStrategy::Visit
    }
}

/// The pieces of a site engine the crawler needs
#[derive(Clone)]
pub struct SiteModule {
    pub categories: Arc<dyn CategorySource>,
    pub extractor: Arc<dyn Extractor>,
}
