//! Output module for extracted rows and run summaries
//!
//! This module handles:
//! - Appending extracted rows to per-page intermediate CSV files
//! - Counting categories, pages, products and rows during a run
//! - Appending a report of each run to the per-date report file

mod csv_writer;
mod report;
pub mod stats;
mod traits;

pub use csv_writer::CsvRowWriter;
pub use report::RunReport;
pub use stats::{CrawlStats, StatsSnapshot};
pub use traits::{OutputError, OutputResult, Row, RowWriter};
