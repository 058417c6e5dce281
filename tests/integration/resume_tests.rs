//! Resuming an interrupted run on a later date

use crate::common::*;
use chrono::NaiveDate;
use listing_crawler::crawler::Coordinator;
use listing_crawler::resume::resume;
use listing_crawler::state::Checkpoint;
use listing_crawler::{CheckpointStore, RunLayout, RunOptions};
use std::sync::Arc;
use tempfile::TempDir;

const PRIOR: &str = "20240101";

fn day(date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date, "%Y%m%d").unwrap()
}

#[tokio::test]
async fn test_resumed_run_continues_prior_progress() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(test_config(dir.path()));
    let layout = RunLayout::from_config(&config);
    let store = CheckpointStore::from_config(&config);

    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_category("Balls", &[&["101", "102"], &["201", "202"]])
            .with_category("Bags", &[&["301"]]),
    );
    fetcher.fail(&product_url("201"));

    // Interrupted run on the prior date
    layout.initialize(PRIOR, false).unwrap();
    let first = Coordinator::new(
        Arc::clone(&config),
        RunOptions::new(PRIOR),
        fake_site(&["Balls", "Bags"]),
        fetcher.clone(),
    );
    assert!(first.run().await.is_err());
    assert!(store.category_state("Bags", PRIOR).await.is_none());

    // Copy it forward and crawl on the new date
    layout.initialize(DATE, false).unwrap();
    let resumed = resume(&layout, DATE, day(DATE)).unwrap();
    assert_eq!(resumed.as_deref(), Some(PRIOR));

    let state = store.category_state("Balls", DATE).await.unwrap();
    assert_eq!(state.page_number, 2);
    assert_eq!(state.date(), DATE);

    fetcher.recover(&product_url("201"));
    fetcher.clear_fetched();
    let writer = Arc::new(RecordingWriter::default());
    let second = Coordinator::new(
        Arc::clone(&config),
        RunOptions::new(DATE),
        fake_site(&["Balls", "Bags"]),
        fetcher.clone(),
    )
    .with_writer(writer.clone());
    second.run().await.unwrap();

    assert_eq!(writer.product_ids(), vec!["201"]);
    let fetched = fetcher.fetched();
    assert!(!fetched.iter().any(|url| url.contains("/bags")));
    assert!(!fetched.contains(&listing_url("Balls", 1)));

    let stats = second.stats().snapshot();
    assert_eq!(stats.categories_skipped, 1);
    assert_eq!(stats.products_skipped, 1);

    // Rows of the prior run were carried over with the checkpoints
    let rows = layout.temporary_csv_file(PRIOR, "Balls", 1);
    let carried = layout
        .temp_dir(DATE)
        .join(rows.file_name().unwrap());
    assert!(carried.is_file());

    // The prior run's files are untouched
    assert!(store.category_state("Balls", PRIOR).await.is_some());
    assert!(layout.states_dir(PRIOR).join("Balls.json").is_file());
}

#[tokio::test]
async fn test_resume_with_nothing_to_resume() {
    let dir = TempDir::new().unwrap();
    let layout = RunLayout::new(dir.path(), SITE);
    layout.initialize(DATE, false).unwrap();

    assert_eq!(resume(&layout, DATE, day(DATE)).unwrap(), None);
}

#[tokio::test]
async fn test_reset_clears_only_the_run_date() {
    let dir = TempDir::new().unwrap();
    let layout = RunLayout::new(dir.path(), SITE);
    layout.initialize(PRIOR, false).unwrap();
    layout.initialize(DATE, false).unwrap();
    std::fs::write(layout.states_dir(PRIOR).join("Balls.json"), "{}").unwrap();
    std::fs::write(layout.states_dir(DATE).join("Balls.json"), "{}").unwrap();

    layout.initialize(DATE, true).unwrap();

    assert!(layout.states_dir(DATE).is_dir());
    assert!(!layout.states_dir(DATE).join("Balls.json").exists());
    assert!(layout.states_dir(PRIOR).join("Balls.json").is_file());
}
