//! Config-driven site engine built on CSS selectors
//!
//! Sites whose listing and product pages are plain server-rendered HTML can be
//! crawled without code: the `[selectors]` section names the product anchors,
//! a regex that pulls the product id out of the product URL, and one selector
//! per output column.

use crate::config::{parse_selector, SelectorConfig};
use crate::crawler::{ContentFetcher, FetchStrategy};
use crate::output::Row;
use crate::site::{Category, CategorySource, ExtractError, ExtractResult, Extractor, ProductLink};
use crate::ConfigError;
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Column holding the product id in every row
pub const PRODUCT_ID_COLUMN: &str = "product_id";

/// Column holding the option name when options are configured
pub const OPTION_COLUMN: &str = "option";

struct Field {
    column: String,
    query: String,
    selector: Selector,
}

/// Extracts products and rows using the configured selectors
pub struct SelectorExtractor {
    products: Selector,
    link_attribute: String,
    product_id: Regex,
    page_param: String,
    fields: Vec<Field>,
    options: Option<Selector>,
}

impl SelectorExtractor {
    /// Compiles the selectors and the product id pattern
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorExtractor)` - Ready-to-use extractor
    /// * `Err(ConfigError)` - A selector or the pattern does not compile
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        let product_id = Regex::new(&config.product_id_pattern).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid product_id_pattern '{}': {}",
                config.product_id_pattern, e
            ))
        })?;

        let fields = config
            .fields
            .iter()
            .map(|(column, query)| {
                Ok(Field {
                    column: column.clone(),
                    query: query.clone(),
                    selector: parse_selector(query)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            products: parse_selector(&config.products)?,
            link_attribute: config.link_attribute.clone(),
            product_id,
            page_param: config.page_param.clone(),
            fields,
            options: config.options.as_deref().map(parse_selector).transpose()?,
        })
    }
}

impl Extractor for SelectorExtractor {
    fn page_url(&self, category_url: &str, page: u32) -> String {
        let Ok(mut url) = Url::parse(category_url) else {
            let separator = if category_url.contains('?') { '&' } else { '?' };
            return format!("{}{}{}={}", category_url, separator, self.page_param, page);
        };

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| *key != self.page_param.as_str())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(&self.page_param, &page.to_string());

        url.to_string()
    }

    fn product_id(&self, url: &str) -> Option<String> {
        self.product_id
            .captures(url)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn listing(&self, content: &str, page_url: &str) -> ExtractResult<Vec<ProductLink>> {
        let base = Url::parse(page_url).map_err(|e| {
            ExtractError::IncorrectData(format!("Invalid listing URL {}: {}", page_url, e))
        })?;
        let document = Html::parse_document(content);

        let mut links: Vec<ProductLink> = Vec::new();
        for element in document.select(&self.products) {
            let Some(href) = element.value().attr(&self.link_attribute) else {
                continue;
            };
            let Some(url) = resolve_link(href, &base) else {
                continue;
            };
            let Some(id) = Extractor::product_id(self, &url) else {
                tracing::warn!("No product id in {}, skipping", url);
                continue;
            };

            if links.iter().any(|link| link.id == id) {
                continue;
            }
            links.push(ProductLink { id, url });
        }

        Ok(links)
    }

    fn product(&self, content: &str, link: &ProductLink) -> ExtractResult<Vec<Row>> {
        let document = Html::parse_document(content);

        let mut row = Row::new().with(PRODUCT_ID_COLUMN, link.id.as_str());
        for field in &self.fields {
            let value = document
                .select(&field.selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
                .ok_or_else(|| ExtractError::QueryNotFound {
                    description: format!("{} not found", field.column),
                    query: field.query.clone(),
                })?;
            row.set(&field.column, value);
        }

        let Some(options) = &self.options else {
            return Ok(vec![row]);
        };

        let names: Vec<String> = document
            .select(options)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();

        if names.is_empty() {
            return Ok(vec![row.with(OPTION_COLUMN, "")]);
        }
        Ok(names
            .into_iter()
            .map(|name| row.clone().with(OPTION_COLUMN, name))
            .collect())
    }
}

/// Scrapes the category list from a single page
pub struct PageCategorySource {
    url: String,
    links: Selector,
}

impl PageCategorySource {
    pub fn new(url: &str, links: &str) -> Result<Self, ConfigError> {
        Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self {
            url: url.to_string(),
            links: parse_selector(links)?,
        })
    }

    fn parse(&self, content: &str) -> crate::Result<Vec<Category>> {
        let base = Url::parse(&self.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        let document = Html::parse_document(content);

        let mut categories: Vec<Category> = Vec::new();
        for element in document.select(&self.links) {
            let name = element_text(element);
            let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, &base))
            else {
                continue;
            };
            if name.is_empty() || categories.iter().any(|c| c.name == name) {
                continue;
            }
            categories.push(Category::new(name, url));
        }

        Ok(categories)
    }
}

#[async_trait]
impl CategorySource for PageCategorySource {
    async fn categories(&self, fetcher: &dyn ContentFetcher) -> crate::Result<Vec<Category>> {
        let content = fetcher.fetch(&self.url, FetchStrategy::Fetch).await?;
        let categories = self.parse(&content)?;
        tracing::info!("Found {} categories on {}", categories.len(), self.url);
        Ok(categories)
    }
}

/// Visible text of an element with whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for empty and fragment-only hrefs, for `javascript:`,
/// `mailto:`, `tel:` and `data:` links, and for anything that does not
/// resolve to http or https.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string())
}
