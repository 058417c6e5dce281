//! Storage module for the filesystem side of a run
//!
//! This module handles:
//! - The per-site, per-date directory layout (temp rows, checkpoints, HTML)
//! - Creating and resetting the current date's directories
//! - Caching fetched pages for reuse by later or resumed runs

mod html;
mod layout;

pub use html::{HtmlCache, HtmlPage};
pub use layout::RunLayout;
