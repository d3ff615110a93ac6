//! Delivery of write operations to the server.
//!
//! [`WriteTransport`] is the seam between the queue machinery and the
//! network. Failures are classified by [`SendError::class`] so the sync
//! engine can decide between retrying later, discarding, or aborting.

mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::RepsyncError;
use crate::features::sync::{EntryId, Operation, QueueEntry};

pub use http::HttpTransport;

/// One write as presented to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Sent as the `Idempotency-Key` header.
    pub idempotency_key: EntryId,
    /// The write itself.
    pub operation: Operation,
    /// Original queue time, for server-side ordering and auditing.
    pub queued_at: DateTime<Utc>,
}

impl WriteRequest {
    /// Request for a direct (not yet queued) send.
    #[must_use]
    pub const fn new(idempotency_key: EntryId, operation: Operation, queued_at: DateTime<Utc>) -> Self {
        Self {
            idempotency_key,
            operation,
            queued_at,
        }
    }
}

impl From<&QueueEntry> for WriteRequest {
    fn from(entry: &QueueEntry) -> Self {
        Self::new(entry.id.clone(), entry.operation.clone(), entry.queued_at)
    }
}

/// Successful server answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteResponse {
    /// HTTP status code (2xx).
    pub status: u16,
    /// Response body, `null` if empty or not JSON.
    pub body: serde_json::Value,
}

/// How a failed send must be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Temporary condition; keep the entry and retry later.
    Transient,
    /// The operation itself is invalid; retrying cannot help.
    Permanent,
    /// The credential was refused; the whole run must stop.
    Credential,
}

/// A failed send.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    /// No answer within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection refused, reset, DNS failure and the like.
    #[error("network error: {0}")]
    Network(String),

    /// Server-side failure or throttling.
    #[error("server unavailable ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided reason.
        message: String,
    },

    /// Structural rejection of the operation.
    #[error("rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided reason.
        message: String,
    },

    /// The server refused the credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl SendError {
    /// Classify a non-success HTTP status.
    ///
    /// 401 is a credential problem; 408, 425 and 429 are throttling or
    /// timing and therefore transient; other 4xx are structural rejections;
    /// everything else is treated as the server being unavailable.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized(message),
            408 | 425 | 429 => Self::Server { status, message },
            400..=499 => Self::Rejected { status, message },
            _ => Self::Server { status, message },
        }
    }

    /// Handling class for this failure.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Timeout | Self::Network(_) | Self::Server { .. } => FailureClass::Transient,
            Self::Rejected { .. } => FailureClass::Permanent,
            Self::Unauthorized(_) => FailureClass::Credential,
        }
    }
}

impl From<SendError> for RepsyncError {
    fn from(e: SendError) -> Self {
        match e {
            SendError::Rejected { status, message } => Self::Rejected { status, message },
            SendError::Unauthorized(message) => Self::Credentials(message),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Network layer used by the interceptor and the sync engine.
#[async_trait]
pub trait WriteTransport: Send + Sync {
    /// Deliver one write.
    ///
    /// Implementations must present `request.idempotency_key` so that a
    /// repeated delivery is a no-op on the server, and must bound the call
    /// with a timeout that surfaces as [`SendError::Timeout`].
    async fn send(
        &self,
        request: &WriteRequest,
        token: Option<&str>,
    ) -> Result<WriteResponse, SendError>;
}
