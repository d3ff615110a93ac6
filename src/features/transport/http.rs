//! HTTP transport for the "create workout" endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{SendError, WriteRequest, WriteResponse, WriteTransport};
use crate::error::RepsyncError;
use crate::features::sync::{Operation, WorkoutLog};

/// Header carrying the entry id.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Longest error body kept in messages.
const MAX_ERROR_LEN: usize = 200;

#[derive(Serialize)]
struct WorkoutBody<'a> {
    #[serde(flatten)]
    log: &'a WorkoutLog,
    queued_at: DateTime<Utc>,
}

/// Sends writes as JSON `POST`s with an idempotency key.
pub struct HttpTransport {
    client: Client,
    workouts_url: String,
}

impl HttpTransport {
    /// Create a transport whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(workouts_url: impl Into<String>, timeout: Duration) -> Result<Self, RepsyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepsyncError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            workouts_url: workouts_url.into(),
        })
    }
}

#[async_trait]
impl WriteTransport for HttpTransport {
    async fn send(
        &self,
        request: &WriteRequest,
        token: Option<&str>,
    ) -> Result<WriteResponse, SendError> {
        let Operation::LogWorkout(log) = &request.operation;
        let body = WorkoutBody {
            log,
            queued_at: request.queued_at,
        };

        let mut builder = self
            .client
            .post(&self.workouts_url)
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.as_str())
            .json(&body);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(classify_reqwest)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(classify_reqwest)?;
        debug!(id = %request.idempotency_key, status, "write delivered");

        if (200..300).contains(&status) {
            let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
            Ok(WriteResponse { status, body })
        } else {
            Err(SendError::from_status(status, error_message(&text)))
        }
    }
}

fn classify_reqwest(e: reqwest::Error) -> SendError {
    if e.is_timeout() {
        SendError::Timeout
    } else {
        SendError::Network(e.to_string())
    }
}

/// Pull `error`/`message` out of a JSON error body, else use the raw text.
fn error_message(text: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        });

    let message = from_json.unwrap_or_else(|| text.trim().to_string());
    if message.is_empty() {
        "no details".to_string()
    } else if message.chars().count() > MAX_ERROR_LEN {
        let truncated: String = message.chars().take(MAX_ERROR_LEN).collect();
        format!("{truncated}...")
    } else {
        message
    }
}
