//! Error types for repsync.

use thiserror::Error;

/// Errors surfaced by the queue, the sync engine, and the CLI.
#[derive(Debug, Error)]
pub enum RepsyncError {
    /// The local queue database failed (open, read, write, migrate).
    #[error("Database error: {0}")]
    Database(String),

    /// The queue refused a new entry because it is at capacity.
    #[error("Offline queue is full ({limit} entries); action was not saved")]
    QueueFull {
        /// Configured maximum number of entries.
        limit: usize,
    },

    /// Configuration could not be read, parsed or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The server could not be reached or failed in a way that may be retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server rejected the operation as invalid; retrying cannot help.
    #[error("Rejected by server ({status}): {message}")]
    Rejected {
        /// HTTP status code returned by the server.
        status: u16,
        /// Server-provided reason.
        message: String,
    },

    /// No usable credential could be obtained.
    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    /// A write could not be queued, so it is lost.
    #[error("Workout was not saved: {0}")]
    NotSaved(#[source] Box<RepsyncError>),
}

impl From<rusqlite::Error> for RepsyncError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_yaml::Error> for RepsyncError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl RepsyncError {
    /// Whether the error came from local storage rather than the network.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::QueueFull { .. } | Self::NotSaved(_)
        )
    }

    /// Wrap a storage failure hit while queueing a write. `QueueFull`
    /// already says so and passes through.
    #[must_use]
    pub fn not_saved(self) -> Self {
        match self {
            e @ (Self::QueueFull { .. } | Self::NotSaved(_)) => e,
            e if e.is_storage() => Self::NotSaved(Box::new(e)),
            e => e,
        }
    }
}
