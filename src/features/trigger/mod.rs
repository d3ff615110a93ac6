//! Trigger sources that start sync runs.
//!
//! [`TriggerLoop`] hosts all of them in one task: the connectivity edge,
//! the periodic timer, the background wake-up marker, and manual requests
//! sent through a [`TriggerHandle`]. Every trigger calls
//! [`SyncEngine::run`](crate::features::sync::SyncEngine::run); the engine
//! itself refuses overlapping runs.

mod background;
mod connectivity;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::features::sync::{RunOutcome, SyncEngine};

pub use background::{background_from_config, BackgroundSync, ForegroundOnly, MarkerBackgroundSync};
pub use connectivity::{ConnectivityMonitor, HealthProbe, HttpHealthProbe};

/// What started a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The client started while online.
    Startup,
    /// Connectivity went from offline to online.
    ConnectivityRestored,
    /// A deferred background wake-up fired.
    BackgroundSignal,
    /// Timer tick.
    Periodic,
    /// The user asked to retry now.
    Manual,
}

impl Trigger {
    /// Forced runs ignore the backoff window. Only timer ticks honor it.
    #[must_use]
    pub const fn is_forced(self) -> bool {
        !matches!(self, Self::Periodic)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::ConnectivityRestored => "connectivity_restored",
            Self::BackgroundSignal => "background_signal",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sends "retry now" requests to a running [`TriggerLoop`].
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<()>,
}

impl TriggerHandle {
    /// Request a manual run. Requests made while one is already waiting
    /// collapse into it. Returns `false` if the loop has stopped.
    pub fn request_sync(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Runs the engine whenever a trigger fires, until shut down.
pub struct TriggerLoop {
    engine: Arc<SyncEngine>,
    connectivity: watch::Receiver<bool>,
    background: Arc<dyn BackgroundSync>,
    periodic_interval: Duration,
    signal_poll_interval: Duration,
    manual: mpsc::Receiver<()>,
}

impl TriggerLoop {
    /// Create a loop and the handle used for manual requests.
    #[must_use]
    pub fn new(
        engine: Arc<SyncEngine>,
        connectivity: watch::Receiver<bool>,
        background: Arc<dyn BackgroundSync>,
    ) -> (Self, TriggerHandle) {
        let (tx, manual) = mpsc::channel(1);
        let trigger_loop = Self {
            engine,
            connectivity,
            background,
            periodic_interval: Duration::from_secs(60),
            signal_poll_interval: Duration::from_secs(1),
            manual,
        };
        (trigger_loop, TriggerHandle { tx })
    }

    /// Set the periodic trigger interval.
    #[must_use]
    pub const fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = interval;
        self
    }

    /// Set how often the background wake-up marker is checked.
    #[must_use]
    pub const fn with_signal_poll_interval(mut self, interval: Duration) -> Self {
        self.signal_poll_interval = interval;
        self
    }

    /// Run until `shutdown` completes.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        let mut online = *self.connectivity.borrow_and_update();
        let mut connectivity_open = true;
        let mut manual_open = true;

        let mut periodic = tokio::time::interval_at(
            Instant::now() + self.periodic_interval,
            self.periodic_interval,
        );
        periodic.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut signal_poll = tokio::time::interval(self.signal_poll_interval);
        signal_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(online, "trigger loop started");
        if online {
            self.fire(Trigger::Startup).await;
        }

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                changed = self.connectivity.changed(), if connectivity_open => {
                    if changed.is_err() {
                        connectivity_open = false;
                        continue;
                    }
                    let now_online = *self.connectivity.borrow_and_update();
                    let restored = now_online && !online;
                    online = now_online;
                    if restored {
                        self.fire(Trigger::ConnectivityRestored).await;
                    }
                },
                _ = periodic.tick() => {
                    if online {
                        self.fire(Trigger::Periodic).await;
                    }
                },
                _ = signal_poll.tick() => {
                    // other processes may have queued writes
                    if let Err(e) = self.engine.store().refresh().await {
                        warn!(error = %e, "could not refresh queue count");
                    }
                    if online {
                        match self.background.take_pending() {
                            Ok(true) => self.fire(Trigger::BackgroundSignal).await,
                            Ok(false) => {},
                            Err(e) => warn!(error = %e, "could not read background wake-up"),
                        }
                    }
                },
                request = self.manual.recv(), if manual_open => {
                    if request.is_some() {
                        self.fire(Trigger::Manual).await;
                    } else {
                        manual_open = false;
                    }
                },
            }
        }

        info!("trigger loop stopped");
    }

    async fn fire(&self, trigger: Trigger) {
        match self.engine.run(trigger).await {
            Ok(RunOutcome::Completed(report)) => {
                debug!(%trigger, summary = %report.summary_line(), "run complete");
            },
            Ok(RunOutcome::AlreadyRunning) => debug!(%trigger, "run skipped"),
            Err(e) => error!(%trigger, error = %e, "sync run failed"),
        }
    }
}
