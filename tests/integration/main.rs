//! Integration tests for Listing-Crawler

mod crawl_tests;
mod resume_tests;
mod site_tests;
