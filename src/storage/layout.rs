//! Run directory layout
//!
//! Every site owns `<base-dir>/<site>/` with one dated subdirectory per run
//! date for temporary rows, checkpoints and cached HTML:
//!
//! ```text
//! <base-dir>/<site>/
//!   temp/<date>/products_<site>_<date>_<category>_<page>_temporary.csv
//!   states/<date>/<category>.json
//!   states/<date>/<category>/<product>.json
//!   html/<date>/<category>-<page>.html
//!   reports/<date>.txt
//! ```

use crate::config::Config;
use crate::state::sanitize_name;
use std::io;
use std::path::{Path, PathBuf};

/// Paths of one site's run directories
#[derive(Debug, Clone)]
pub struct RunLayout {
    site: String,
    site_dir: PathBuf,
}

impl RunLayout {
    pub fn new(base_dir: impl AsRef<Path>, site: &str) -> Self {
        Self {
            site: site.to_string(),
            site_dir: base_dir.as_ref().join(site),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.output.base_dir, &config.site.name)
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    pub fn temp_root(&self) -> PathBuf {
        self.site_dir.join("temp")
    }

    pub fn states_root(&self) -> PathBuf {
        self.site_dir.join("states")
    }

    pub fn html_root(&self) -> PathBuf {
        self.site_dir.join("html")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.site_dir.join("reports")
    }

    pub fn temp_dir(&self, date: &str) -> PathBuf {
        self.temp_root().join(date)
    }

    pub fn states_dir(&self, date: &str) -> PathBuf {
        self.states_root().join(date)
    }

    pub fn html_dir(&self, date: &str) -> PathBuf {
        self.html_root().join(date)
    }

    /// Dated directories that belong to one run, in copy order
    pub fn dated_dirs(&self, date: &str) -> [PathBuf; 3] {
        [self.temp_dir(date), self.states_dir(date), self.html_dir(date)]
    }

    /// Creates the run directories for `date`
    ///
    /// With `reset`, the date's temp, state and HTML directories are removed
    /// first so the run starts from scratch. Calling this twice is harmless.
    pub fn initialize(&self, date: &str, reset: bool) -> io::Result<()> {
        if reset {
            for dir in self.dated_dirs(date) {
                if dir.exists() {
                    tracing::info!("Deleting {}", dir.display());
                    std::fs::remove_dir_all(&dir)?;
                }
            }
        }

        for dir in self.dated_dirs(date) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::create_dir_all(self.reports_dir())?;

        Ok(())
    }

    /// Intermediate row file of one category listing page
    pub fn temporary_csv_file(&self, date: &str, category: &str, page: u32) -> PathBuf {
        self.temp_dir(date).join(format!(
            "products_{}_{}_{}_{}_temporary.csv",
            self.site,
            date,
            sanitize_name(category),
            page
        ))
    }

    /// Intermediate row file of a custom URL batch
    pub fn custom_urls_csv_file(&self, date: &str) -> PathBuf {
        self.temp_dir(date).join(format!(
            "products_{}_{}_CUSTOM_URLS_temporary.csv",
            self.site, date
        ))
    }

    /// Resolves a file name relative to the site directory
    pub fn site_file(&self, name: &str) -> PathBuf {
        self.site_dir.join(name)
    }
}
