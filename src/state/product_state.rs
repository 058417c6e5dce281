//! Checkpoint of a single extracted product

use crate::state::sanitize_name;
use crate::state::store::Checkpoint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Completion record of one product within a category
///
/// Keyed by (site, date, category, product id). `done` is only ever set after
/// every row of the product has been written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductState {
    pub product_id: String,

    /// Owning category name with path separators replaced
    pub category_name: String,

    pub date: String,

    pub site: String,

    #[serde(default)]
    pub done: bool,
}

impl ProductState {
    pub fn new(product_id: &str, category_name: &str, date: &str, site: &str) -> Self {
        Self {
            product_id: sanitize_name(product_id),
            category_name: sanitize_name(category_name),
            date: date.to_string(),
            site: site.to_string(),
            done: false,
        }
    }

    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

impl Checkpoint for ProductState {
    const KIND: &'static str = "product";

    fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.site)
            .join("states")
            .join(&self.date)
            .join(&self.category_name)
            .join(format!("{}.json", self.product_id))
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
