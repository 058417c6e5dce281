//! Cache of fetched listing and product pages
//!
//! Cached pages are stored under `html/<date>` and copied forward by resume,
//! so a resumed run can re-read a listing page without hitting the site.

use crate::state::sanitize_name;
use std::io;
use std::path::PathBuf;

/// Identifies one cached page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlPage<'a> {
    /// A category listing page
    Category { category: &'a str, page: u32 },

    /// A product detail page reached from a listing page
    Product {
        category: &'a str,
        page: u32,
        product_id: &'a str,
    },
}

/// Reads and writes cached pages for one site
#[derive(Debug, Clone)]
pub struct HtmlCache {
    html_root: PathBuf,
}

impl HtmlCache {
    pub fn new(html_root: impl Into<PathBuf>) -> Self {
        Self {
            html_root: html_root.into(),
        }
    }

    /// Location of a cached page for a run date
    pub fn path(&self, date: &str, page: &HtmlPage<'_>) -> PathBuf {
        let dir = self.html_root.join(date);
        match page {
            HtmlPage::Category { category, page } => {
                dir.join(format!("{}-{}.html", sanitize_name(category), page))
            }
            HtmlPage::Product {
                category,
                page,
                product_id,
            } => dir
                .join(sanitize_name(category))
                .join(page.to_string())
                .join(format!("{}.html", sanitize_name(product_id))),
        }
    }

    /// Returns the cached page, if present, readable and not blank
    pub async fn read(&self, date: &str, page: &HtmlPage<'_>) -> Option<String> {
        let path = self.path(date, page);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => {
                tracing::warn!("Ignoring empty HTML cache {}", path.display());
                None
            }
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable HTML cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stores a page unless a non-empty copy is already cached
    ///
    /// The page is written to a sibling `.tmp` file and renamed into place, so
    /// an interrupted write never leaves a truncated page behind.
    pub async fn write(&self, date: &str, page: &HtmlPage<'_>, content: &str) -> io::Result<()> {
        let path = self.path(date, page);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() > 0 => return Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await
    }
}
