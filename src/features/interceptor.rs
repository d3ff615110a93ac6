//! Optimistic write submission.
//!
//! [`WriteInterceptor::submit`] tries the network first. If the write cannot
//! be delivered right now it is queued under the same idempotency key, and
//! the caller is told it was accepted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RepsyncError;
use crate::features::collab::CredentialProvider;
use crate::features::sync::{EntryId, Operation, QueueStore};
use crate::features::transport::{FailureClass, WriteRequest, WriteTransport};
use crate::features::trigger::BackgroundSync;

/// Result of submitting a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    /// Idempotency key the write was sent or queued under.
    pub entry_id: EntryId,
    /// `true` if the write is waiting in the offline queue.
    pub queued: bool,
    /// When it was queued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_at: Option<DateTime<Utc>>,
    /// Server response body for a direct delivery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<serde_json::Value>,
    /// Why the direct send did not go through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Wraps outgoing writes with offline fallback.
pub struct WriteInterceptor {
    store: QueueStore,
    transport: Arc<dyn WriteTransport>,
    credentials: Arc<dyn CredentialProvider>,
    background: Arc<dyn BackgroundSync>,
}

impl WriteInterceptor {
    /// Create an interceptor queueing into `store`.
    #[must_use]
    pub fn new(
        store: QueueStore,
        transport: Arc<dyn WriteTransport>,
        credentials: Arc<dyn CredentialProvider>,
        background: Arc<dyn BackgroundSync>,
    ) -> Self {
        Self {
            store,
            transport,
            credentials,
            background,
        }
    }

    /// Deliver `operation`, or queue it if the server cannot be reached.
    ///
    /// # Errors
    ///
    /// Returns [`RepsyncError::Rejected`] if the server refused the write
    /// (nothing is queued). If queueing fails the error is
    /// [`RepsyncError::QueueFull`] or [`RepsyncError::NotSaved`].
    pub async fn submit(&self, operation: Operation) -> Result<Submission, RepsyncError> {
        let id = EntryId::generate();

        let token = match self.credentials.access_token().await {
            Ok(token) => token,
            Err(e) => return self.defer(id, operation, e.to_string()).await,
        };

        let request = WriteRequest::new(id.clone(), operation, Utc::now());
        match self.transport.send(&request, token.as_deref()).await {
            Ok(response) => {
                debug!(id = %id, status = response.status, "delivered directly");
                Ok(Submission {
                    entry_id: id,
                    queued: false,
                    queued_at: None,
                    server: Some(response.body),
                    reason: None,
                })
            },
            Err(e) if e.class() == FailureClass::Permanent => Err(e.into()),
            Err(e) => self.defer(id, request.operation, e.to_string()).await,
        }
    }

    async fn defer(
        &self,
        id: EntryId,
        operation: Operation,
        reason: String,
    ) -> Result<Submission, RepsyncError> {
        let entry = self
            .store
            .enqueue_with_id(id, operation)
            .await
            .map_err(RepsyncError::not_saved)?;
        info!(id = %entry.id, %reason, "write queued for later");

        if let Err(e) = self.background.register() {
            warn!(error = %e, "could not register background sync");
        }

        Ok(Submission {
            entry_id: entry.id,
            queued: true,
            queued_at: Some(entry.queued_at),
            server: None,
            reason: Some(reason),
        })
    }
}
