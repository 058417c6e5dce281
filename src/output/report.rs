//! Per-date run reports
//!
//! Every run appends a numbered block to `reports/<date>.txt`, so a date that
//! was crawled in several attempts keeps one block per attempt.

use crate::output::stats::StatsSnapshot;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

const RUN_MARKER: &str = "Run #";

/// Summary of one finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub site: String,
    pub date: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub config_hash: String,
    /// Date the run resumed from, if any
    pub resumed_from: Option<String>,
    /// `None` for a run that completed, otherwise the error that ended it
    pub error: Option<String>,
    pub stats: StatsSnapshot,
}

impl RunReport {
    /// Renders the report block for the given run number
    pub fn render(&self, run_number: usize) -> String {
        let elapsed = (self.finished_at - self.started_at).num_seconds().max(0);
        let status = match &self.error {
            None => "completed".to_string(),
            Some(e) => format!("failed: {}", e),
        };

        let mut out = String::new();
        out.push_str(&format!("{}{}\n", RUN_MARKER, run_number));
        out.push_str(&format!("Site: {}\n", self.site));
        out.push_str(&format!("Run Date: {}\n", self.date));
        out.push_str(&format!(
            "Start Time: {}\n",
            self.started_at.format("%Y%m%d %H:%M:%S")
        ));
        out.push_str(&format!(
            "End Time: {}\n",
            self.finished_at.format("%Y%m%d %H:%M:%S")
        ));
        out.push_str(&format!(
            "Time took: {}:{:02}:{:02}\n",
            elapsed / 3600,
            (elapsed % 3600) / 60,
            elapsed % 60
        ));
        out.push_str(&format!("Config hash: {}\n", self.config_hash));
        if let Some(from) = &self.resumed_from {
            out.push_str(&format!("Resumed from: {}\n", from));
        }
        out.push_str(&format!("Status: {}\n", status));
        out.push_str(&format!(
            "Categories: {} crawled, {} already done, {} failed\n",
            self.stats.categories_crawled, self.stats.categories_skipped, self.stats.categories_failed
        ));
        out.push_str(&format!(
            "Products: {} extracted, {} already done, {} failed\n",
            self.stats.products_extracted, self.stats.products_skipped, self.stats.products_failed
        ));
        out.push_str(&format!("Pages: {}\n", self.stats.pages_crawled));
        out.push_str(&format!("Rows: {}", self.stats.rows_written));
        out
    }

    /// Appends the report to `<reports_dir>/<date>.txt`
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - The report file
    /// * `Err(std::io::Error)` - The report could not be read or written
    pub async fn append_to(&self, reports_dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(reports_dir).await?;
        let path = reports_dir.join(format!("{}.txt", self.date));

        let existing = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };

        let run_number = existing.matches(RUN_MARKER).count() + 1;
        let mut content = existing;
        if run_number > 1 {
            content.push_str("\n\n");
        }
        content.push_str(&self.render(run_number));

        tokio::fs::write(&path, content).await?;
        tracing::info!("Report saved to {}", path.display());

        Ok(path)
    }
}
