//! Helpers on top of `std::result::Result`
//!
//! Every fallible step in the crawler returns a `Result` and callers match on
//! both variants or propagate with `?`. `Result::ok` and `Result::map` cover
//! tolerated failures and value transforms. What std does not have is an
//! `expect` that reports instead of panicking: `OrFatal` turns a missing value
//! into `CrawlError::Fatal`, which is reserved for configuration or
//! programming errors and never for ordinary site variability.

use crate::CrawlError;
use std::fmt::Display;

/// Converts a failure into a fatal, unrecoverable crawl error
pub trait OrFatal<T> {
    /// Returns the value, or `CrawlError::Fatal` carrying `message`
    fn or_fatal(self, message: &str) -> Result<T, CrawlError>;
}

impl<T> OrFatal<T> for Option<T> {
    fn or_fatal(self, message: &str) -> Result<T, CrawlError> {
        self.ok_or_else(|| CrawlError::Fatal(message.to_string()))
    }
}

impl<T, E: Display> OrFatal<T> for Result<T, E> {
    fn or_fatal(self, message: &str) -> Result<T, CrawlError> {
        self.map_err(|e| CrawlError::Fatal(format!("{}: {}", message, e)))
    }
}
