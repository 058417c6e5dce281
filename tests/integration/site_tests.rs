//! End-to-end runs of the selector engine against a mock site

use crate::common::*;
use listing_crawler::config::{Config, FetcherConfig, SelectorConfig};
use listing_crawler::crawler::crawl;
use listing_crawler::{CrawlError, RunLayout, RunOptions};
use std::collections::BTreeMap;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn selector_config(base_dir: &std::path::Path) -> Config {
    let mut config = test_config(base_dir);
    config.site.engine = "selector".to_string();
    config.fetcher = FetcherConfig {
        rate_limit: 50,
        retry_delay: 10,
        ..FetcherConfig::default()
    };
    config.output.columns = ["category", "product_id", "name", "price", "option"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), "h1.name".to_string());
    fields.insert("price".to_string(), "span.price".to_string());
    config.selectors = Some(SelectorConfig {
        products: "a.item".to_string(),
        link_attribute: "href".to_string(),
        product_id_pattern: r"/goods/(\d+)".to_string(),
        page_param: "page".to_string(),
        fields,
        options: Some("li.option".to_string()),
        categories_url: None,
        category_links: None,
    });
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_listing(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/category/balls"))
        .and(query_param("page", page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn mount_product(server: &MockServer, id: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/goods/{}", id)))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_selector_site_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = selector_config(dir.path());
    let layout = RunLayout::from_config(&config);

    std::fs::create_dir_all(layout.site_dir()).unwrap();
    std::fs::write(
        layout.site_file("categories.txt"),
        format!("# golf\nBalls, {}/category/balls\n", server.uri()),
    )
    .unwrap();

    mount_listing(
        &server,
        "1",
        r#"<a class="item" href="/goods/101">Tour</a>
           <a class="item" href="/goods/102">Soft</a>
           <a class="item" href="/goods/101">Tour again</a>"#,
    )
    .await;
    mount_listing(&server, "2", "<p>No products</p>").await;
    mount_product(
        &server,
        "101",
        r#"<h1 class="name">Tour Ball</h1><span class="price">30000</span>
           <ul><li class="option">White</li><li class="option">Yellow</li></ul>"#,
    )
    .await;
    mount_product(
        &server,
        "102",
        r#"<h1 class="name">Soft Ball</h1><span class="price">25000</span>"#,
    )
    .await;

    let stats = crawl(config, RunOptions::new(DATE), "abc123").await.unwrap();

    assert_eq!(stats.categories_crawled, 1);
    assert_eq!(stats.pages_crawled, 1);
    assert_eq!(stats.products_extracted, 2);
    assert_eq!(stats.rows_written, 3);

    let content =
        std::fs::read_to_string(layout.temporary_csv_file(DATE, "Balls", 1)).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("category,product_id,name,price,option"));
    let mut rows: Vec<&str> = lines.collect();
    rows.sort();
    assert_eq!(
        rows,
        vec![
            "Balls,101,Tour Ball,30000,White",
            "Balls,101,Tour Ball,30000,Yellow",
            "Balls,102,Soft Ball,25000,",
        ]
    );

    let report =
        std::fs::read_to_string(layout.reports_dir().join(format!("{}.txt", DATE))).unwrap();
    assert!(report.starts_with("Run #1"));
    assert!(report.contains("Status: completed"));
    assert!(report.contains("Config hash: abc123"));
}

#[tokio::test]
async fn test_missing_field_fails_product() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = selector_config(dir.path());
    let layout = RunLayout::from_config(&config);

    std::fs::create_dir_all(layout.site_dir()).unwrap();
    std::fs::write(
        layout.site_file("categories.txt"),
        format!("Balls, {}/category/balls\n", server.uri()),
    )
    .unwrap();

    mount_listing(&server, "1", r#"<a class="item" href="/goods/101">Tour</a>"#).await;
    mount_product(&server, "101", r#"<h1 class="name">Tour Ball</h1>"#).await;

    let error = crawl(config, RunOptions::new(DATE), "abc123").await.unwrap_err();
    assert!(matches!(error, CrawlError::ItemsFailed { failed: 1, .. }));

    // A failed run still leaves a report
    let report =
        std::fs::read_to_string(layout.reports_dir().join(format!("{}.txt", DATE))).unwrap();
    assert!(report.contains("Status: failed"));
}

#[tokio::test]
async fn test_unknown_engine_stops_before_crawling() {
    let dir = TempDir::new().unwrap();
    let mut config = selector_config(dir.path());
    config.site.engine = "headless".to_string();

    let error = crawl(config, RunOptions::new(DATE), "abc123").await.unwrap_err();
    assert!(matches!(error, CrawlError::UnknownSite(ref name) if name == "headless"));
}

#[tokio::test]
async fn test_missing_categories_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = selector_config(dir.path());

    let error = crawl(config, RunOptions::new(DATE), "abc123").await.unwrap_err();
    assert!(matches!(error, CrawlError::Fatal(_)));
}
