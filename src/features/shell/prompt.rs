//! Prompt segment for shells.
//!
//! Prints nothing when the queue is empty, so it can be embedded in a
//! prompt unconditionally.

use clap::ValueEnum;
use serde::Serialize;

use crate::error::RepsyncError;
use crate::features::sync::QueueStore;

/// Style of the prompt segment.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptFormat {
    /// Just the number, e.g. `3`.
    #[default]
    Plain,
    /// Arrow and number, e.g. `⇡3`.
    Icon,
    /// Labeled, e.g. `unsynced:3`.
    Labeled,
    /// JSON object.
    Json,
}

/// Data behind the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromptStatus {
    /// Entries waiting in the queue.
    pub pending: usize,
}

impl PromptStatus {
    /// Render in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render(&self, format: PromptFormat) -> Result<String, RepsyncError> {
        if self.pending == 0 && format != PromptFormat::Json {
            return Ok(String::new());
        }
        Ok(match format {
            PromptFormat::Plain => self.pending.to_string(),
            PromptFormat::Icon => format!("⇡{}", self.pending),
            PromptFormat::Labeled => format!("unsynced:{}", self.pending),
            PromptFormat::Json => serde_json::to_string(self)?,
        })
    }
}

/// Read the queue and render the segment.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn prompt_segment(store: &QueueStore, format: PromptFormat) -> Result<String, RepsyncError> {
    let status = PromptStatus {
        pending: store.count().await?,
    };
    status.render(format)
}
