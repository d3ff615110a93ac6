//! Connectivity observation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::RepsyncError;

/// Answers "can the server be reached right now?".
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Check reachability once.
    async fn is_reachable(&self) -> bool;
}

/// Probes the server's health endpoint with a short timeout.
pub struct HttpHealthProbe {
    client: Client,
    url: String,
}

impl HttpHealthProbe {
    /// Probe `url`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RepsyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepsyncError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "health probe failed");
                false
            },
        }
    }
}

/// Publishes the online/offline state.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Start with a known state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    /// Observe the state; `changed()` fires on every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Current state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record a new state; returns whether it differs from the previous one.
    pub fn set(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            info!(online, "connectivity changed");
        }
        changed
    }

    /// Probe once and record the result.
    pub async fn check(&self, probe: &dyn HealthProbe) -> bool {
        let online = probe.is_reachable().await;
        self.set(online);
        online
    }

    /// Probe every `interval` until `shutdown` flips to `true`.
    pub async fn poll(
        &self,
        probe: &dyn HealthProbe,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check(probe).await;
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
            }
        }
    }
}
