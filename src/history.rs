//! Rolling price history kept in a JSON file.
//!
//! The file holds a JSON array of [`HistoryRecord`]s in insertion order. Every append
//! rewrites the whole array, trimmed to the newest `capacity` entries.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::flight::HistoryRecord;

/// Number of runs retained when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read history file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("history file {} is malformed at '{}'", .path.display(), .json_path)]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize history")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write history file {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only history backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored record. A missing file is an empty history.
    pub async fn load(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let jd = &mut serde_json::Deserializer::from_str(&body);
        serde_path_to_error::deserialize(jd).map_err(|err| HistoryError::Parse {
            path: self.path.clone(),
            json_path: err.path().to_string(),
            source: err.into_inner(),
        })
    }

    /// Append `record`, evict the oldest entries beyond capacity, and rewrite the file.
    ///
    /// Returns the number of records stored after the write.
    pub async fn append(&self, record: HistoryRecord) -> Result<usize, HistoryError> {
        let mut history = self.load().await?;
        let evicted = push_bounded(&mut history, record, self.capacity);
        self.write(&history).await?;

        debug!(evicted, "history trimmed to capacity");
        info!(
            path = %self.path.display(),
            entries = history.len(),
            "history saved"
        );
        Ok(history.len())
    }

    /// Write through a sibling temp file so an interrupted run never leaves a truncated array.
    async fn write(&self, history: &[HistoryRecord]) -> Result<(), HistoryError> {
        let body = serde_json::to_string_pretty(history)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_err = |source: std::io::Error| HistoryError::Write {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, body).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)
    }
}

/// Push `item` and drop entries from the front until at most `capacity` remain.
///
/// Returns how many entries were dropped.
pub fn push_bounded<T>(items: &mut Vec<T>, item: T, capacity: usize) -> usize {
    items.push(item);
    let excess = items.len().saturating_sub(capacity);
    items.drain(..excess);
    excess
}
