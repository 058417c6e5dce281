//! Checkpoint of one category's pagination progress

use crate::state::sanitize_name;
use crate::state::store::Checkpoint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Progress of a category crawl for one site and run date
///
/// There is exactly one state per (site, date, category). The page cursor only
/// moves forward during a run, and `done` is terminal: a category whose stored
/// state is done is skipped entirely by later runs on the same date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryState {
    /// Category name with path separators replaced
    pub name: String,

    /// Next listing page to crawl
    pub page_number: u32,

    /// Run date (`YYYYMMDD`)
    pub date: String,

    /// Site identifier
    pub site: String,

    /// Set once a listing page came back without products
    #[serde(default)]
    pub done: bool,
}

impl CategoryState {
    /// Creates a not-done state positioned at `page_number`
    pub fn new(name: &str, page_number: u32, date: &str, site: &str) -> Self {
        Self {
            name: sanitize_name(name),
            page_number,
            date: date.to_string(),
            site: site.to_string(),
            done: false,
        }
    }

    /// Moves the cursor to the next listing page
    pub fn advance(&mut self) {
        self.page_number += 1;
    }

    /// Marks the category as fully crawled
    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

impl Checkpoint for CategoryState {
    const KIND: &'static str = "category";

    fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.site)
            .join("states")
            .join(&self.date)
            .join(format!("{}.json", self.name))
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn set_date(&mut self, date: &str) {
        self.date = date.to_string();
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn reset_done(&mut self) {
        self.done = false;
    }
}
