//! Run resume
//!
//! Resuming copies the artifacts of the nearest prior run date (temporary
//! rows, checkpoints, cached HTML) into the current date's directories before
//! crawling starts. The crawl itself then skips finished work through the
//! normal checkpoint lookups; nothing here knows about categories or products.

use crate::storage::RunLayout;
use chrono::NaiveDate;
use regex::Regex;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Outcome of copying one prior run forward
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Files copied into the current date
    pub copied: usize,
    /// Files already present in the current date and left alone
    pub skipped: usize,
    /// Files that could not be copied
    pub failed: usize,
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{8}").expect("static date pattern"))
}

/// Extracts the distinct run dates embedded in directory names
///
/// The first 8-digit run in each name is parsed as `YYYYMMDD`; names without
/// a valid date are ignored, and so is `current_date`.
pub fn find_dates<I, S>(names: I, current_date: &str) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut dates = Vec::new();
    for name in names {
        let Some(found) = date_pattern().find(name.as_ref()) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(found.as_str(), "%Y%m%d") else {
            continue;
        };
        if date.format("%Y%m%d").to_string() == current_date {
            continue;
        }
        if !dates.contains(&date) {
            dates.push(date);
        }
    }
    dates
}

/// Picks the date closest to `now`; the first one wins a tie
pub fn nearest_date(now: NaiveDate, dates: &[NaiveDate]) -> Option<NaiveDate> {
    dates
        .iter()
        .copied()
        .min_by_key(|date| (*date - now).num_days().abs())
}

/// Copies the nearest prior run into `current_date`
///
/// Returns the prior date that was copied, or `None` when no prior run
/// exists. Only listing the temp root can fail; individual file copies that
/// fail are logged and counted.
pub fn resume(layout: &RunLayout, current_date: &str, now: NaiveDate) -> io::Result<Option<String>> {
    let names = match std::fs::read_dir(layout.temp_root()) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };

    let dates = find_dates(&names, current_date);
    let Some(last) = nearest_date(now, &dates) else {
        tracing::info!("No previous run found to resume from");
        return Ok(None);
    };
    let last = last.format("%Y%m%d").to_string();

    tracing::info!("Copying files from the {} run into {}", last, current_date);
    let stats = copy_forward(layout, &last, current_date);
    tracing::info!(
        "Resumed from {}: {} copied, {} already present, {} failed",
        last,
        stats.copied,
        stats.skipped,
        stats.failed
    );

    Ok(Some(last))
}

/// Merges the temp, state and HTML directories of `from` into `to`
pub fn copy_forward(layout: &RunLayout, from: &str, to: &str) -> CopyStats {
    let mut stats = CopyStats::default();
    for (src, dst) in layout.dated_dirs(from).iter().zip(layout.dated_dirs(to).iter()) {
        merge_dir(src, dst, &mut stats);
    }
    stats
}

/// Recursively copies `src` into `dst` without overwriting existing files
fn merge_dir(src: &Path, dst: &Path, stats: &mut CopyStats) {
    if !src.is_dir() {
        return;
    }

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", src.display(), e);
                stats.failed += 1;
                continue;
            }
        };

        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            if let Err(e) = std::fs::create_dir_all(&target) {
                tracing::warn!("Failed to create {}: {}", target.display(), e);
            }
            continue;
        }

        if target.exists() {
            stats.skipped += 1;
            continue;
        }

        let copied = target
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::copy(entry.path(), &target));
        match copied {
            Ok(_) => stats.copied += 1,
            Err(e) => {
                tracing::warn!("Failed to copy {}: {}", entry.path().display(), e);
                stats.failed += 1;
            }
        }
    }
}
