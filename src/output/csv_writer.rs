//! Append-only CSV row writer for intermediate files

use crate::output::traits::{OutputError, OutputResult, Row, RowWriter};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Writes rows to CSV files, one header per file
///
/// With configured columns every file uses that order: fields a row lacks are
/// left empty and fields not listed are dropped. Without columns, a file takes
/// the field order of its first row.
pub struct CsvRowWriter {
    columns: Vec<String>,
    lock: Mutex<()>,
}

impl CsvRowWriter {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            lock: Mutex::new(()),
        }
    }

    fn header<'a>(&'a self, row: &'a Row) -> Vec<&'a str> {
        if self.columns.is_empty() {
            row.names().collect()
        } else {
            self.columns.iter().map(String::as_str).collect()
        }
    }

    fn record<'a>(&self, row: &'a Row) -> Vec<&'a str> {
        if self.columns.is_empty() {
            row.values().collect()
        } else {
            self.columns
                .iter()
                .map(|column| row.get(column).unwrap_or(""))
                .collect()
        }
    }

    fn encode(&self, row: &Row, with_header: bool, path: &Path) -> OutputResult<Vec<u8>> {
        let to_error = |source| OutputError::Write {
            path: path.display().to_string(),
            source,
        };

        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        if with_header {
            writer.write_record(self.header(row)).map_err(to_error)?;
        }
        writer.write_record(self.record(row)).map_err(to_error)?;

        writer
            .into_inner()
            .map_err(|e| OutputError::Io(e.into_error()))
    }
}

#[async_trait]
impl RowWriter for CsvRowWriter {
    async fn append(&self, file: &Path, row: &Row) -> OutputResult<()> {
        let _guard = self.lock.lock().await;

        let exists = tokio::fs::try_exists(file).await?;
        if !exists {
            if let Some(dir) = file.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        let bytes = self.encode(row, !exists, file)?;

        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .await?;
        handle.write_all(&bytes).await?;
        handle.flush().await?;

        Ok(())
    }
}
