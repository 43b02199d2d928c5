//! Append-only output sinks
//!
//! The pagination engine pushes accepted comment batches to a
//! [`CommentSink`] as they arrive, so a run that ends partially still has
//! everything collected so far on disk. The crate ships a JSON-lines file
//! sink; callers can supply their own implementation for other backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::Comment;
use crate::utils::error::SinkError;

/// Append-only consumer of comment batches
#[async_trait]
pub trait CommentSink: Send + Sync {
    /// Append one batch; must not reorder or drop records on success
    async fn append(&self, batch: &[Comment]) -> Result<(), SinkError>;
}

/// One serialized output line: the comment plus a fetch timestamp
#[derive(Serialize)]
struct SinkRecord<'a> {
    #[serde(flatten)]
    comment: &'a Comment,
    fetched_at: DateTime<Utc>,
}

/// JSON-lines file sink, one record per line, append-only
pub struct JsonLinesSink {
    file: Mutex<tokio::fs::File>,
}

impl JsonLinesSink {
    /// Open (or create) the output file for appending
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Io` if the file cannot be opened
    pub async fn create(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl CommentSink for JsonLinesSink {
    async fn append(&self, batch: &[Comment]) -> Result<(), SinkError> {
        let now = Utc::now();
        let mut buffer = String::new();

        for comment in batch {
            let record = SinkRecord {
                comment,
                fetched_at: now,
            };
            buffer.push_str(&serde_json::to_string(&record)?);
            buffer.push('\n');
        }

        let mut file = self.file.lock().await;
        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

/// In-memory sink for tests and library embedding
#[derive(Default)]
pub struct MemorySink {
    records: std::sync::Mutex<Vec<Comment>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Comment> {
        self.records.lock().expect("sink mutex poisoned").clone()
    }
}

#[async_trait]
impl CommentSink for MemorySink {
    async fn append(&self, batch: &[Comment]) -> Result<(), SinkError> {
        self.records
            .lock()
            .expect("sink mutex poisoned")
            .extend_from_slice(batch);
        Ok(())
    }
}
