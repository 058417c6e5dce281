//! Categories read from a `name, url` list file

use crate::crawler::ContentFetcher;
use crate::site::{Category, CategorySource};
use crate::{ConfigError, CrawlError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads categories from a file with one `name, url` pair per line
///
/// Blank lines and lines starting with `#` are ignored.
#[derive(Debug, Clone)]
pub struct FileCategorySource {
    path: PathBuf,
}

impl FileCategorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CategorySource for FileCategorySource {
    async fn categories(&self, _fetcher: &dyn ContentFetcher) -> crate::Result<Vec<Category>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CrawlError::Fatal(format!(
                "Cannot read categories file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let categories = parse_categories(&content)
            .map_err(|e| ConfigError::Validation(format!("{}: {}", self.path.display(), e)))?;
        tracing::info!(
            "Loaded {} categories from {}",
            categories.len(),
            self.path.display()
        );
        Ok(categories)
    }
}

/// Parses `name, url` lines
///
/// The name ends at the first `", "` and the URL starts after the last one.
pub fn parse_categories(content: &str) -> Result<Vec<Category>, String> {
    let mut categories = Vec::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (Some((name, _)), Some((_, url))) = (line.split_once(", "), line.rsplit_once(", "))
        else {
            return Err(format!("line {}: expected 'name, url', got '{}'", number + 1, line));
        };

        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || url.is_empty() {
            return Err(format!("line {}: empty name or url", number + 1));
        }
        categories.push(Category::new(name, url));
    }

    Ok(categories)
}
