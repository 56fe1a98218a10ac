//! # Event persistence sink
//!
//! The external storage collaborator. The aggregator calls it
//! fire-and-forget: a sink failure is logged and swallowed, it never
//! rolls back or blocks the in-memory merge.

use qs_core::QueryEvent;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

type SinkError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn persist(&self, event: &QueryEvent) -> Result<(), SinkError>;
}

/// Appends one JSON object per line to a file.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl EventSink for JsonlSink {
    async fn persist(&self, event: &QueryEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// Discards events. Used when no persistence collaborator is configured.
pub struct NullSink;

#[async_trait::async_trait]
impl EventSink for NullSink {
    async fn persist(&self, _event: &QueryEvent) -> Result<(), SinkError> {
        Ok(())
    }
}
