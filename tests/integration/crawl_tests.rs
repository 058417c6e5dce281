//! Crawl orchestration tests against an in-memory site

use crate::common::*;
use listing_crawler::config::FailurePolicy;
use listing_crawler::crawler::{ConcurrencyGovernor, Coordinator};
use listing_crawler::{CheckpointStore, CrawlError, RunLayout, RunOptions};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    config: Arc<listing_crawler::Config>,
    fetcher: Arc<FakeFetcher>,
    writer: Arc<RecordingWriter>,
    categories: Vec<&'static str>,
}

impl Harness {
    fn new(categories: &[&'static str], fetcher: FakeFetcher) -> Self {
        Self::with_config(categories, fetcher, |_| {})
    }

    fn with_config(
        categories: &[&'static str],
        fetcher: FakeFetcher,
        configure: impl FnOnce(&mut listing_crawler::Config),
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        configure(&mut config);
        Self {
            _dir: dir,
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            writer: Arc::new(RecordingWriter::default()),
            categories: categories.to_vec(),
        }
    }

    fn coordinator(&self, options: RunOptions) -> Coordinator {
        Coordinator::new(
            Arc::clone(&self.config),
            options,
            fake_site(&self.categories),
            self.fetcher.clone(),
        )
        .with_writer(self.writer.clone())
    }

    async fn run(&self) -> listing_crawler::Result<()> {
        self.coordinator(RunOptions::new(DATE)).run().await
    }

    fn store(&self) -> CheckpointStore {
        CheckpointStore::from_config(&self.config)
    }

    fn layout(&self) -> RunLayout {
        RunLayout::from_config(&self.config)
    }
}

#[tokio::test]
async fn test_crawls_pages_until_listing_is_empty() {
    let fetcher = FakeFetcher::new().with_category("Balls", &[&["101", "102", "103"], &["201"]]);
    let harness = Harness::new(&["Balls"], fetcher);

    harness.run().await.unwrap();

    assert_eq!(harness.writer.product_ids().len(), 4);
    let rows = harness.writer.rows();
    let layout = harness.layout();
    let page_one = layout.temporary_csv_file(DATE, "Balls", 1);
    let page_two = layout.temporary_csv_file(DATE, "Balls", 2);
    assert_eq!(rows.iter().filter(|(file, _)| *file == page_one).count(), 3);
    assert_eq!(rows.iter().filter(|(file, _)| *file == page_two).count(), 1);

    let (_, row) = &rows[0];
    assert_eq!(row.get("category"), Some("Balls"));
    assert_eq!(row.get("product_url"), Some(product_url(row.get("product_id").unwrap()).as_str()));

    // The empty third page ends the category
    assert!(harness.fetcher.fetched().contains(&listing_url("Balls", 3)));
    assert!(!harness.fetcher.fetched().contains(&listing_url("Balls", 4)));
    assert!(harness.store().category_state("Balls", DATE).await.is_none());
}

#[tokio::test]
async fn test_second_run_skips_finished_work() {
    let fetcher = FakeFetcher::new()
        .with_category("Balls", &[&["101", "102"]])
        .with_category("Bags", &[&["301"]]);
    let harness = Harness::new(&["Balls", "Bags"], fetcher);

    harness.run().await.unwrap();
    assert_eq!(harness.writer.product_ids().len(), 3);

    harness.fetcher.clear_fetched();
    let coordinator = harness.coordinator(RunOptions::new(DATE));
    coordinator.run().await.unwrap();

    assert!(harness.fetcher.fetched().is_empty());
    assert_eq!(harness.writer.product_ids().len(), 3);
    let stats = coordinator.stats().snapshot();
    assert_eq!(stats.categories_skipped, 2);
    assert_eq!(stats.categories_crawled, 0);
}

#[tokio::test]
async fn test_failed_product_keeps_page_cursor() {
    let fetcher = FakeFetcher::new().with_category("Balls", &[&["101", "102"], &["201", "202"]]);
    fetcher.fail(&product_url("201"));
    let harness = Harness::new(&["Balls"], fetcher);

    let error = harness.run().await.unwrap_err();
    assert!(matches!(
        error,
        CrawlError::ItemsFailed { failed: 1, total: 2, .. }
    ));

    let store = harness.store();
    let state = store.category_state("Balls", DATE).await.unwrap();
    assert_eq!(state.page_number, 2);
    assert!(!state.done);
    assert!(store.product_state("101", "Balls", DATE).await.is_none());
    assert!(store.product_state("202", "Balls", DATE).await.is_none());
    assert!(store.product_state("201", "Balls", DATE).await.is_some());

    // The next run picks up page 2 and only extracts the failed product
    harness.fetcher.recover(&product_url("201"));
    harness.fetcher.clear_fetched();
    harness.run().await.unwrap();

    let fetched = harness.fetcher.fetched();
    assert!(!fetched.contains(&listing_url("Balls", 1)));
    assert!(fetched.contains(&product_url("201")));
    assert!(!fetched.contains(&product_url("202")));
    assert!(store.category_state("Balls", DATE).await.is_none());

    let mut ids = harness.writer.product_ids();
    ids.sort();
    assert_eq!(ids, vec!["101", "102", "201", "202"]);
}

#[tokio::test]
async fn test_failed_chunk_stops_the_page() {
    let fetcher =
        FakeFetcher::new().with_category("Balls", &[&["101", "102", "103", "104", "105"]]);
    fetcher.fail(&product_url("102"));
    let harness = Harness::new(&["Balls"], fetcher);

    assert!(harness.run().await.is_err());

    // Chunks of two: the first chunk fails, so 103..105 are never started
    let fetched = harness.fetcher.fetched();
    assert!(fetched.contains(&product_url("101")));
    assert!(!fetched.contains(&product_url("103")));
    assert_eq!(harness.writer.product_ids(), vec!["101"]);
}

#[tokio::test]
async fn test_category_range() {
    let mut fetcher = FakeFetcher::new();
    for name in ["Apparel", "Balls", "Bags", "Gloves"] {
        fetcher = fetcher.with_category(name, &[&[]]);
    }
    let harness = Harness::with_config(&["Apparel", "Balls", "Bags", "Gloves"], fetcher, |config| {
        config.site.start_category = Some("Balls".to_string());
        config.site.end_category = Some("Bags".to_string());
    });

    let coordinator = harness.coordinator(RunOptions::new(DATE));
    let selected = coordinator.selected_categories().await.unwrap();
    assert_eq!(
        selected.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["Balls", "Bags"]
    );

    coordinator.run().await.unwrap();
    let fetched = harness.fetcher.fetched();
    assert!(fetched.iter().all(|url| url.contains("/balls") || url.contains("/bags")));
}

#[tokio::test]
async fn test_abort_policy_stops_later_category_chunks() {
    let fetcher = FakeFetcher::new()
        .with_category("Apparel", &[&["101"]])
        .with_category("Balls", &[&["201"]])
        .with_category("Bags", &[&["301"]]);
    fetcher.fail(&listing_url("Apparel", 1));
    let harness = Harness::with_config(&["Apparel", "Balls", "Bags"], fetcher, |config| {
        config.crawler.categories_chunk_size = 1;
    });

    let coordinator = harness.coordinator(RunOptions::new(DATE));
    let error = coordinator.run().await.unwrap_err();
    assert!(matches!(error, CrawlError::Fetch(_)));

    let fetched = harness.fetcher.fetched();
    assert!(!fetched.iter().any(|url| url.contains("/balls")));
    assert_eq!(coordinator.stats().snapshot().categories_failed, 1);
}

#[tokio::test]
async fn test_continue_policy_crawls_remaining_categories() {
    let fetcher = FakeFetcher::new()
        .with_category("Apparel", &[&["101"]])
        .with_category("Balls", &[&["201"]])
        .with_category("Bags", &[&["301"]]);
    fetcher.fail(&listing_url("Apparel", 1));
    let harness = Harness::with_config(&["Apparel", "Balls", "Bags"], fetcher, |config| {
        config.crawler.categories_chunk_size = 1;
        config.crawler.on_failure = FailurePolicy::Continue;
    });

    let coordinator = harness.coordinator(RunOptions::new(DATE));
    coordinator.run().await.unwrap();

    assert_eq!(harness.writer.product_ids(), vec!["201", "301"]);
    let stats = coordinator.stats().snapshot();
    assert_eq!(stats.categories_failed, 1);
    assert_eq!(stats.categories_crawled, 2);
}

#[tokio::test]
async fn test_disabled_checkpoints_recrawl_everything() {
    let fetcher = FakeFetcher::new().with_category("Balls", &[&["101", "102"]]);
    let harness = Harness::with_config(&["Balls"], fetcher, |config| {
        config.crawler.use_category_checkpoints = false;
        config.crawler.use_product_checkpoints = false;
    });

    harness.run().await.unwrap();
    harness.run().await.unwrap();

    assert_eq!(harness.writer.product_ids().len(), 4);
    let states = harness.layout().states_dir(DATE);
    assert!(!states.join("Balls.json").exists());
}

struct ConstantGovernor(usize);

impl ConcurrencyGovernor for ConstantGovernor {
    fn next_chunk_size(&self, _categories_chunk: usize, _products_chunk: usize) -> usize {
        self.0
    }
}

#[tokio::test]
async fn test_governor_sets_product_chunk_size() {
    let fetcher = FakeFetcher::new().with_category("Balls", &[&["101", "102", "103", "104"]]);
    fetcher.fail(&product_url("104"));
    let harness = Harness::new(&["Balls"], fetcher);

    // One chunk of four: the failure no longer stops 101..103
    let coordinator = harness
        .coordinator(RunOptions::new(DATE))
        .with_governor(Arc::new(ConstantGovernor(4)));
    let _ = coordinator.run().await;

    let mut ids = harness.writer.product_ids();
    ids.sort();
    assert_eq!(ids, vec!["101", "102", "103"]);
}

#[tokio::test]
async fn test_custom_urls_batch() {
    let fetcher = FakeFetcher::new().with_category("Balls", &[&["101", "102", "103"]]);
    fetcher.fail(&product_url("102"));
    let harness = Harness::new(&["Balls"], fetcher);

    let mut options = RunOptions::new(DATE);
    options.urls = vec![product_url("101"), product_url("102"), product_url("103")];
    let coordinator = harness.coordinator(options);

    let error = coordinator.run().await.unwrap_err();
    assert!(matches!(
        error,
        CrawlError::ItemsFailed { failed: 1, total: 3, .. }
    ));

    // Later URLs are still crawled after a failure
    let rows = harness.writer.rows();
    assert_eq!(harness.writer.product_ids(), vec!["101", "103"]);
    let file = harness.layout().custom_urls_csv_file(DATE);
    assert!(rows.iter().all(|(path, _)| *path == file));
    assert!(rows.iter().all(|(_, row)| row.get("category").is_none()));

    // No listing pages and no checkpoints
    assert!(harness
        .fetcher
        .fetched()
        .iter()
        .all(|url| url.contains("/goods/")));
    assert!(harness.store().product_state("101", "Balls", DATE).await.is_some());
}

#[tokio::test]
async fn test_rows_reach_csv_file() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.output.columns = vec![
        "category".to_string(),
        "product_id".to_string(),
        "price".to_string(),
    ];
    let fetcher = Arc::new(FakeFetcher::new().with_category("Balls", &[&["101", "102"]]));

    let coordinator = Coordinator::new(
        Arc::new(config),
        RunOptions::new(DATE),
        fake_site(&["Balls"]),
        fetcher,
    );
    coordinator.run().await.unwrap();

    let file = coordinator.layout().temporary_csv_file(DATE, "Balls", 1);
    let content = std::fs::read_to_string(file).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("category,product_id,price"));
    let mut rows: Vec<&str> = lines.collect();
    rows.sort();
    assert_eq!(rows, vec!["Balls,101,10100", "Balls,102,10200"]);
}

#[tokio::test]
async fn test_fixed_chunking_uses_max_chunk_size() {
    let fetcher = FakeFetcher::new().with_category("Balls", &[&["101", "102", "103", "104"]]);
    fetcher.fail(&product_url("101"));
    let harness = Harness::with_config(&["Balls"], fetcher, |config| {
        config.crawler.min_products_chunk_size = 1;
        config.crawler.max_products_chunk_size = 4;
    });

    assert!(harness.run().await.is_err());

    // All four products share one chunk, so the failure stops nothing
    let fetched = harness.fetcher.fetched();
    for id in ["101", "102", "103", "104"] {
        assert!(fetched.contains(&product_url(id)), "{} not fetched", id);
    }
    let mut ids = harness.writer.product_ids();
    ids.sort();
    assert_eq!(ids, vec!["102", "103", "104"]);
}

#[tokio::test]
async fn test_product_with_options_writes_every_row() {
    let fetcher = FakeFetcher::new()
        .with_category("Balls", &[&["101", "102"]])
        .with_product("101", "price:30000\noptions:White,Yellow,Orange");
    let harness = Harness::new(&["Balls"], fetcher);

    let coordinator = harness.coordinator(RunOptions::new(DATE));
    coordinator.run().await.unwrap();

    let rows = harness.writer.rows();
    let options: Vec<&str> = rows
        .iter()
        .filter(|(_, row)| row.get("product_id") == Some("101"))
        .filter_map(|(_, row)| row.get("option"))
        .collect();
    assert_eq!(options, vec!["White", "Yellow", "Orange"]);

    let stats = coordinator.stats().snapshot();
    assert_eq!(stats.products_extracted, 2);
    assert_eq!(stats.rows_written, 4);
    assert!(harness.store().product_state("101", "Balls", DATE).await.is_none());
}

#[tokio::test]
async fn test_unwritten_rows_keep_product_open() {
    let fetcher = FakeFetcher::new()
        .with_category("Balls", &[&["101", "102"]])
        .with_product("101", "price:30000\noptions:White,Yellow");
    let harness = Harness::new(&["Balls"], fetcher);
    let writer = Arc::new(FailingWriter::new("101", "Yellow"));

    let coordinator = harness
        .coordinator(RunOptions::new(DATE))
        .with_writer(writer.clone());
    let error = coordinator.run().await.unwrap_err();
    assert!(matches!(error, CrawlError::ItemsFailed { failed: 1, .. }));

    // The first option row made it out, the product is still not done
    assert!(writer.inner.product_ids().contains(&"101".to_string()));
    let store = harness.store();
    assert!(store.product_state("101", "Balls", DATE).await.is_some());
    assert!(store.product_state("102", "Balls", DATE).await.is_none());
    assert_eq!(store.category_state("Balls", DATE).await.unwrap().page_number, 1);
}

#[tokio::test]
async fn test_saved_html_is_reused() {
    let fetcher = FakeFetcher::new().with_category("Balls", &[&["101", "102"]]);
    let harness = Harness::with_config(&["Balls"], fetcher, |config| {
        config.crawler.save_html = true;
    });

    harness.run().await.unwrap();

    let html = harness.layout().html_dir(DATE);
    assert!(html.join("Balls-1.html").is_file());
    assert!(html.join("Balls-2.html").is_file());
    assert!(html.join("Balls/1/101.html").is_file());

    // Without checkpoints every page comes from the cache
    std::fs::remove_dir_all(harness.layout().states_dir(DATE)).unwrap();
    harness.fetcher.clear_fetched();
    harness.run().await.unwrap();

    assert!(harness.fetcher.fetched().is_empty());
    assert_eq!(harness.writer.product_ids().len(), 4);
}

#[tokio::test]
async fn test_empty_cached_listing_is_fetched_again() {
    let fetcher = FakeFetcher::new().with_category("Balls", &[&["101", "102"]]);
    let harness = Harness::with_config(&["Balls"], fetcher, |config| {
        config.crawler.save_html = true;
    });

    let html = harness.layout().html_dir(DATE);
    std::fs::create_dir_all(&html).unwrap();
    std::fs::write(html.join("Balls-1.html"), "").unwrap();

    harness.run().await.unwrap();

    assert!(harness.fetcher.fetched().contains(&listing_url("Balls", 1)));
    let mut ids = harness.writer.product_ids();
    ids.sort();
    assert_eq!(ids, vec!["101", "102"]);
    assert!(harness.store().category_state("Balls", DATE).await.is_none());
    assert!(std::fs::read_to_string(html.join("Balls-1.html"))
        .unwrap()
        .contains("item:101"));
}
