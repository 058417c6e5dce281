//! Filesystem checkpoint store
//!
//! Each checkpoint lives in its own JSON file below
//! `<base-dir>/<site>/states/<date>/`. No two work items share a file, so
//! reads and writes need no locking.

use crate::config::Config;
use crate::state::{CategoryState, ProductState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current checkpoint file schema
pub const CHECKPOINT_VERSION: u32 = 1;

/// `EBADF`: the file handle was closed underneath the write
const BAD_FILE_DESCRIPTOR: i32 = 9;

/// Errors that can occur while reading or writing checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt checkpoint {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported checkpoint version {found} in {path}")]
    Version { path: PathBuf, found: u32 },

    #[error("Checkpoint {path} holds a {found} state, expected {expected}")]
    Kind {
        path: PathBuf,
        expected: &'static str,
        found: String,
    },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// A state record that can be persisted by the store
pub trait Checkpoint: Serialize + DeserializeOwned + Send + Sync {
    /// Tag written into the file envelope
    const KIND: &'static str;

    /// Path of the checkpoint file relative to the base directory
    fn relative_path(&self) -> PathBuf;

    fn date(&self) -> &str;

    fn set_date(&mut self, date: &str);

    fn is_done(&self) -> bool;

    fn reset_done(&mut self);
}

#[derive(Serialize)]
struct EnvelopeRef<'a, C> {
    version: u32,
    kind: &'a str,
    state: &'a C,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    kind: String,
    state: serde_json::Value,
}

/// Reads, writes and hands out category and product checkpoints
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    base_dir: PathBuf,
    site: String,
    start_page: u32,
    use_category_checkpoints: bool,
    use_product_checkpoints: bool,
}

impl CheckpointStore {
    /// Creates a store rooted at `base_dir` with checkpointing enabled
    pub fn new(base_dir: impl Into<PathBuf>, site: &str, start_page: u32) -> Self {
        Self {
            base_dir: base_dir.into(),
            site: site.to_string(),
            start_page,
            use_category_checkpoints: true,
            use_product_checkpoints: true,
        }
    }

    /// Creates a store from the site and crawler sections of the config
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_dir: config.output.base_dir.clone(),
            site: config.site.name.clone(),
            start_page: config.site.start_page,
            use_category_checkpoints: config.crawler.use_category_checkpoints,
            use_product_checkpoints: config.crawler.use_product_checkpoints,
        }
    }

    /// Enables or disables checkpointing per entity type
    pub fn with_checkpoints(mut self, categories: bool, products: bool) -> Self {
        self.use_category_checkpoints = categories;
        self.use_product_checkpoints = products;
        self
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// Absolute location of a state's checkpoint file
    pub fn path_of<C: Checkpoint>(&self, state: &C) -> PathBuf {
        self.base_dir.join(state.relative_path())
    }

    /// Returns true if a checkpoint file exists for the state's key
    pub async fn exists<C: Checkpoint>(&self, state: &C) -> bool {
        tokio::fs::try_exists(self.path_of(state))
            .await
            .unwrap_or(false)
    }

    /// Loads the stored checkpoint for the state's key
    ///
    /// The returned state always has `done == false`, and takes the date of
    /// `state` if the file recorded a different one (a checkpoint copied into
    /// another date's directory belongs to that date). The file itself is not
    /// rewritten.
    pub async fn load<C: Checkpoint>(&self, state: &C) -> CheckpointResult<C> {
        let mut loaded = self.read(state).await?;
        loaded.reset_done();
        Ok(loaded)
    }

    /// Reads the stored checkpoint with its recorded `done` flag intact
    async fn read<C: Checkpoint>(&self, state: &C) -> CheckpointResult<C> {
        let path = self.path_of(state);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| CheckpointError::Io {
                path: path.clone(),
                source,
            })?;

        let mut loaded: C = decode(&path, &bytes)?;

        if loaded.date() != state.date() {
            tracing::debug!(
                "Checkpoint {} was saved on {} but sits in the {} directory, adopting {}",
                path.display(),
                loaded.date(),
                state.date(),
                state.date()
            );
            loaded.set_date(state.date());
        }

        Ok(loaded)
    }

    /// Writes the checkpoint, replacing any previous file
    ///
    /// The state is written to a sibling temporary file first and renamed over
    /// the target so a crash never leaves a half-written checkpoint. A closed
    /// file handle (`EBADF`) is logged and ignored; any other I/O error is
    /// returned.
    pub async fn save<C: Checkpoint>(&self, state: &C) -> CheckpointResult<()> {
        let path = self.path_of(state);
        let bytes = serde_json::to_vec_pretty(&EnvelopeRef {
            version: CHECKPOINT_VERSION,
            kind: C::KIND,
            state,
        })?;

        match write_replace(&path, &bytes).await {
            Ok(()) => Ok(()),
            Err(e) if e.raw_os_error() == Some(BAD_FILE_DESCRIPTOR) => {
                tracing::warn!("Checkpoint {} save failed: {}", path.display(), e);
                Ok(())
            }
            Err(source) => Err(CheckpointError::Io { path, source }),
        }
    }

    /// Returns the category state to crawl, or `None` if it is already done
    pub async fn category_state(&self, name: &str, date: &str) -> Option<CategoryState> {
        let fresh = CategoryState::new(name, self.start_page, date, &self.site);
        self.get_or_create(fresh, self.use_category_checkpoints).await
    }

    /// Returns the product state to extract, or `None` if it is already done
    pub async fn product_state(
        &self,
        product_id: &str,
        category_name: &str,
        date: &str,
    ) -> Option<ProductState> {
        let fresh = ProductState::new(product_id, category_name, date, &self.site);
        self.get_or_create(fresh, self.use_product_checkpoints).await
    }

    /// Persists a category state if category checkpoints are enabled
    pub async fn save_category(&self, state: &CategoryState) -> CheckpointResult<()> {
        if !self.use_category_checkpoints {
            return Ok(());
        }
        self.save(state).await
    }

    /// Persists a product state if product checkpoints are enabled
    pub async fn save_product(&self, state: &ProductState) -> CheckpointResult<()> {
        if !self.use_product_checkpoints {
            return Ok(());
        }
        self.save(state).await
    }

    /// Resolves a fresh state against its checkpoint file
    ///
    /// A stored state recorded as done means the work item is finished for this
    /// run. An unreadable checkpoint is treated as absent.
    async fn get_or_create<C: Checkpoint>(&self, fresh: C, enabled: bool) -> Option<C> {
        if !enabled || !self.exists(&fresh).await {
            return Some(fresh);
        }

        match self.read(&fresh).await {
            Ok(stored) if stored.is_done() => {
                tracing::debug!(
                    "{} checkpoint {} is done, skipping",
                    C::KIND,
                    self.path_of(&fresh).display()
                );
                None
            }
            Ok(stored) => Some(stored),
            Err(e) => {
                tracing::warn!("Ignoring unusable checkpoint: {}", e);
                Some(fresh)
            }
        }
    }
}

fn decode<C: Checkpoint>(path: &Path, bytes: &[u8]) -> CheckpointResult<C> {
    let corrupt = |source| CheckpointError::Corrupt {
        path: path.to_path_buf(),
        source,
    };

    let envelope: Envelope = serde_json::from_slice(bytes).map_err(corrupt)?;
    if envelope.version != CHECKPOINT_VERSION {
        return Err(CheckpointError::Version {
            path: path.to_path_buf(),
            found: envelope.version,
        });
    }
    if envelope.kind != C::KIND {
        return Err(CheckpointError::Kind {
            path: path.to_path_buf(),
            expected: C::KIND,
            found: envelope.kind,
        });
    }

    serde_json::from_value(envelope.state).map_err(corrupt)
}

async fn write_replace(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        match tokio::fs::create_dir_all(dir).await {
            Err(e) if e.kind() != ErrorKind::AlreadyExists => return Err(e),
            _ => {}
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
