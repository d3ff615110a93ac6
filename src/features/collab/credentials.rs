//! Credential providers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::RepsyncError;

/// Supplies the bearer token for each outgoing write.
///
/// Called once per send so short-lived tokens stay fresh over long runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current access token, or `None` for anonymous requests.
    ///
    /// # Errors
    ///
    /// Returns [`RepsyncError::Credentials`] if a token is required but
    /// cannot be obtained right now.
    async fn access_token(&self) -> Result<Option<String>, RepsyncError>;
}

/// A fixed token (or none at all).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    /// Use `token` for every request.
    #[must_use]
    pub const fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> Result<Option<String>, RepsyncError> {
        Ok(self.token.clone())
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// Exchanges a refresh token for an access token before every send.
pub struct RefreshCredentials {
    client: Client,
    refresh_url: String,
    refresh_token: String,
}

impl RefreshCredentials {
    /// Build a provider posting to `refresh_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        refresh_url: impl Into<String>,
        refresh_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RepsyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepsyncError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            refresh_url: refresh_url.into(),
            refresh_token: refresh_token.into(),
        })
    }
}

#[async_trait]
impl CredentialProvider for RefreshCredentials {
    async fn access_token(&self) -> Result<Option<String>, RepsyncError> {
        let response = self
            .client
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                refresh_token: &self.refresh_token,
            })
            .send()
            .await
            .map_err(|e| RepsyncError::Credentials(format!("token refresh failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepsyncError::Credentials(format!(
                "token refresh returned {}",
                status.as_u16()
            )));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RepsyncError::Credentials(format!("invalid refresh response: {e}")))?;
        debug!("access token refreshed");

        Ok(Some(body.access_token))
    }
}

/// Pick a provider from the `auth` config section.
///
/// A refresh URL together with a refresh token selects
/// [`RefreshCredentials`]; otherwise the static token (possibly none) is used.
/// `token_override` (from `--token`) always wins.
///
/// # Errors
///
/// Returns an error if the refresh client cannot be built.
pub fn provider_from_config(
    auth: &AuthConfig,
    token_override: Option<String>,
    timeout: Duration,
) -> Result<Arc<dyn CredentialProvider>, RepsyncError> {
    if let Some(token) = token_override {
        return Ok(Arc::new(StaticCredentials::new(Some(token))));
    }

    match (&auth.refresh_url, &auth.refresh_token) {
        (Some(url), Some(token)) => Ok(Arc::new(RefreshCredentials::new(url, token, timeout)?)),
        _ => Ok(Arc::new(StaticCredentials::new(auth.resolve_token()))),
    }
}
