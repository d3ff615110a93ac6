//! Sync engine draining the offline queue against the server.
//!
//! One run takes a snapshot of the queue and replays it oldest first. Each
//! entry is claimed before it is sent, then removed on success or on a
//! permanent rejection. A transient failure puts it back and stops the run so
//! nothing overtakes it. A credential failure also stops the run, but does
//! not count as an attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::operation::QueueEntry;
use super::queue::QueueStore;
use super::report::{HaltReason, Rejection, RunOutcome, SyncReport};
use crate::config::{ServerConfig, SyncConfig};
use crate::error::RepsyncError;
use crate::features::collab::{
    CacheInvalidator, CacheScope, CredentialProvider, NoopInvalidator, Notifier, TracingNotifier,
};
use crate::features::transport::{FailureClass, SendError, WriteRequest, WriteTransport};
use crate::features::trigger::Trigger;

/// Longest window any configured duration is allowed to span.
const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Seconds from config as a window, capped at [`MAX_WINDOW_SECS`].
fn window(secs: u64) -> Duration {
    let capped = secs.min(MAX_WINDOW_SECS);
    Duration::try_seconds(i64::try_from(capped).unwrap_or(0)).unwrap_or_else(Duration::zero)
}

/// Tuning for the sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pause between two sends within one run.
    pub inter_request_delay: StdDuration,
    /// First backoff window after a transient failure.
    pub backoff_base: Duration,
    /// Backoff ceiling.
    pub backoff_max: Duration,
    /// In-flight claims older than this are considered abandoned.
    pub stale_after: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inter_request_delay: StdDuration::from_millis(250),
            backoff_base: Duration::seconds(5),
            backoff_max: Duration::seconds(300),
            stale_after: Duration::seconds(60),
        }
    }
}

impl EngineConfig {
    /// Build from the `sync` and `server` config sections.
    ///
    /// Claims are considered abandoned after twice the request timeout plus
    /// half a minute, so a live sender is never robbed mid-request. Every
    /// window is capped at 30 days.
    #[must_use]
    pub fn from_config(sync: &SyncConfig, server: &ServerConfig) -> Self {
        Self {
            inter_request_delay: StdDuration::from_millis(sync.inter_request_delay_ms),
            backoff_base: window(sync.backoff_base_secs),
            backoff_max: window(sync.backoff_max_secs),
            stale_after: window(
                server
                    .request_timeout_secs
                    .saturating_mul(2)
                    .saturating_add(30),
            ),
        }
    }
}

/// Clears the running flag and the syncing signal on every exit path.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    syncing: &'a watch::Sender<bool>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.syncing.send_replace(false);
    }
}

/// What to do after handling one entry.
enum Step {
    Continue,
    Halt(HaltReason),
}

/// Drains the queue. At most one run is active per engine.
pub struct SyncEngine {
    store: QueueStore,
    transport: Arc<dyn WriteTransport>,
    credentials: Arc<dyn CredentialProvider>,
    cache: Arc<dyn CacheInvalidator>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    running: AtomicBool,
    syncing: watch::Sender<bool>,
}

impl SyncEngine {
    /// Create an engine with no cache, log-only notifications and default
    /// tuning.
    #[must_use]
    pub fn new(
        store: QueueStore,
        transport: Arc<dyn WriteTransport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let (syncing, _) = watch::channel(false);
        Self {
            store,
            transport,
            credentials,
            cache: Arc::new(NoopInvalidator),
            notifier: Arc::new(TracingNotifier),
            config: EngineConfig::default(),
            running: AtomicBool::new(false),
            syncing,
        }
    }

    /// Use `cache` for post-sync invalidation.
    #[must_use]
    pub fn with_cache_invalidator(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = cache;
        self
    }

    /// Use `notifier` for warnings and summaries.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Use custom tuning.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The queue this engine drains.
    #[must_use]
    pub const fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Observe whether a run is in progress.
    #[must_use]
    pub fn subscribe_syncing(&self) -> watch::Receiver<bool> {
        self.syncing.subscribe()
    }

    /// Whether a run is in progress right now.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one sync pass.
    ///
    /// Returns [`RunOutcome::AlreadyRunning`] without doing anything if a run
    /// is in progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue database fails mid-run. An entry claimed
    /// at that moment is reclaimed by a later run.
    pub async fn run(&self, trigger: Trigger) -> Result<RunOutcome, RepsyncError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%trigger, "sync already running");
            return Ok(RunOutcome::AlreadyRunning);
        }
        let _guard = RunGuard {
            running: &self.running,
            syncing: &self.syncing,
        };
        self.syncing.send_replace(true);

        let report = self.drain(trigger).await?;
        Ok(RunOutcome::Completed(report))
    }

    async fn drain(&self, trigger: Trigger) -> Result<SyncReport, RepsyncError> {
        let mut report = SyncReport::new(trigger);

        let reclaimed = self.store.reclaim_stale(self.config.stale_after).await?;
        if reclaimed > 0 {
            info!(reclaimed, "reclaimed abandoned in-flight entries");
        }

        let snapshot = self.store.list_pending().await?;
        if snapshot.is_empty() {
            debug!(%trigger, "queue empty");
            return Ok(report);
        }

        if !trigger.is_forced() {
            let retry_at = snapshot[0].retry_at(self.config.backoff_base, self.config.backoff_max);
            if let Some(retry_at) = retry_at.filter(|at| *at > Utc::now()) {
                debug!(%trigger, %retry_at, "head entry backing off");
                report.remaining = snapshot.len();
                report.halt = Some(HaltReason::Backoff { retry_at });
                return Ok(report);
            }
        }

        info!(%trigger, pending = snapshot.len(), "sync started");

        // Entries confirmed before a storage failure still stale the caches.
        let replayed = self.replay(&snapshot, &mut report).await;
        if report.synced > 0 {
            if let Err(e) = self.cache.invalidate(&CacheScope::AFTER_SYNC) {
                warn!(error = %e, "cache invalidation failed");
            }
        }
        replayed?;

        report.remaining = self.store.count().await?;
        info!(
            %trigger,
            synced = report.synced,
            rejected = report.rejected.len(),
            remaining = report.remaining,
            "sync finished"
        );
        if snapshot.len() > 1 {
            self.notifier.summary(&report.summary_line());
        }

        Ok(report)
    }

    async fn replay(
        &self,
        snapshot: &[QueueEntry],
        report: &mut SyncReport,
    ) -> Result<(), RepsyncError> {
        for (index, entry) in snapshot.iter().enumerate() {
            if index > 0 && !self.config.inter_request_delay.is_zero() {
                tokio::time::sleep(self.config.inter_request_delay).await;
            }

            match self.sync_entry(entry, report).await? {
                Step::Continue => {},
                Step::Halt(reason) => {
                    warn!(trigger = %report.trigger, ?reason, "sync halted");
                    report.halt = Some(reason);
                    break;
                },
            }
        }
        Ok(())
    }

    async fn sync_entry(
        &self,
        entry: &QueueEntry,
        report: &mut SyncReport,
    ) -> Result<Step, RepsyncError> {
        if !self.store.mark_in_flight(&entry.id).await? {
            // Gone means another sender already delivered it.
            if self.store.get(&entry.id).await?.is_none() {
                return Ok(Step::Continue);
            }
            return Ok(Step::Halt(HaltReason::Contended {
                id: entry.id.clone(),
            }));
        }

        let token = match self.credentials.access_token().await {
            Ok(token) => token,
            Err(e) => {
                self.store.revert_in_flight(&entry.id).await?;
                return Ok(Step::Halt(HaltReason::Credentials {
                    error: e.to_string(),
                }));
            },
        };

        let request = WriteRequest::from(entry);
        let error = match self.transport.send(&request, token.as_deref()).await {
            Ok(_) => {
                self.store.remove(&entry.id).await?;
                debug!(id = %entry.id, "entry synced");
                report.synced += 1;
                return Ok(Step::Continue);
            },
            Err(e) => e,
        };

        match error.class() {
            FailureClass::Permanent => {
                self.store.remove(&entry.id).await?;
                let (status, reason) = match &error {
                    SendError::Rejected { status, message } => (*status, message.clone()),
                    other => (0, other.to_string()),
                };
                self.notifier.warn(&format!(
                    "\"{}\" ({}) was rejected by the server and discarded: {reason}",
                    entry.operation.describe(),
                    entry.age_description(Utc::now()),
                ));
                report.rejected.push(Rejection {
                    id: entry.id.clone(),
                    operation: entry.operation.describe(),
                    status,
                    reason,
                });
                Ok(Step::Continue)
            },
            FailureClass::Transient => {
                let message = error.to_string();
                self.store.mark_pending(&entry.id, &message).await?;
                Ok(Step::Halt(HaltReason::Transient {
                    id: entry.id.clone(),
                    error: message,
                }))
            },
            FailureClass::Credential => {
                self.store.revert_in_flight(&entry.id).await?;
                Ok(Step::Halt(HaltReason::Credentials {
                    error: error.to_string(),
                }))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::features::collab::{MockCacheInvalidator, MockCredentialProvider, StaticCredentials};
    use crate::features::sync::{EntryId, EntryStatus, Operation};
    use crate::features::transport::WriteResponse;

    /// Answers from a script, then succeeds.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<(), SendError>>>,
        sent: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedTransport {
        fn with_script(script: Vec<Result<(), SendError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                sent: Mutex::default(),
            }
        }

        fn sent_ids(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
        }
    }

    #[async_trait]
    impl WriteTransport for ScriptedTransport {
        async fn send(
            &self,
            request: &WriteRequest,
            token: Option<&str>,
        ) -> Result<WriteResponse, SendError> {
            self.sent
                .lock()
                .unwrap()
                .push((request.idempotency_key.to_string(), token.map(String::from)));
            let next = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
            next.map(|()| WriteResponse {
                status: 201,
                body: serde_json::Value::Null,
            })
        }
    }

    /// Applies each idempotency key once; the first attempt at `flaky`
    /// is applied but the response is lost.
    #[derive(Default)]
    struct DedupingServer {
        seen: Mutex<HashSet<String>>,
        applied: Mutex<Vec<String>>,
        flaky: Option<String>,
        dropped: Mutex<bool>,
    }

    #[async_trait]
    impl WriteTransport for DedupingServer {
        async fn send(
            &self,
            request: &WriteRequest,
            _token: Option<&str>,
        ) -> Result<WriteResponse, SendError> {
            let key = request.idempotency_key.to_string();
            if self.seen.lock().unwrap().insert(key.clone()) {
                self.applied.lock().unwrap().push(key.clone());
            }

            let mut dropped = self.dropped.lock().unwrap();
            if self.flaky.as_deref() == Some(key.as_str()) && !*dropped {
                *dropped = true;
                return Err(SendError::Timeout);
            }
            Ok(WriteResponse {
                status: 201,
                body: serde_json::Value::Null,
            })
        }
    }

    /// Blocks every send until released.
    #[derive(Default)]
    struct GatedTransport {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl WriteTransport for GatedTransport {
        async fn send(
            &self,
            _request: &WriteRequest,
            _token: Option<&str>,
        ) -> Result<WriteResponse, SendError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(WriteResponse {
                status: 201,
                body: serde_json::Value::Null,
            })
        }
    }

    /// Accepts every send, but drops the queue table while sending `breaks_at`.
    struct BreaksStorage {
        store: QueueStore,
        breaks_at: String,
    }

    #[async_trait]
    impl WriteTransport for BreaksStorage {
        async fn send(
            &self,
            request: &WriteRequest,
            _token: Option<&str>,
        ) -> Result<WriteResponse, SendError> {
            if request.idempotency_key.as_str() == self.breaks_at {
                let db = self.store.database_for_tests().await;
                db.connection().execute("DROP TABLE write_queue", []).unwrap();
            }
            Ok(WriteResponse {
                status: 201,
                body: serde_json::Value::Null,
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        warnings: Mutex<Vec<String>>,
        summaries: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn warn(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }

        fn summary(&self, message: &str) {
            self.summaries.lock().unwrap().push(message.to_string());
        }
    }

    fn fast_config() -> EngineConfig {
        EngineConfig {
            inter_request_delay: StdDuration::ZERO,
            ..EngineConfig::default()
        }
    }

    fn engine(store: &QueueStore, transport: Arc<dyn WriteTransport>) -> SyncEngine {
        SyncEngine::new(
            store.clone(),
            transport,
            Arc::new(StaticCredentials::new(Some("token".to_string()))),
        )
        .with_config(fast_config())
    }

    async fn seed(store: &QueueStore, ids: &[&str]) {
        for (i, id) in ids.iter().enumerate() {
            let amount = u32::try_from(i).unwrap() + 10;
            store
                .enqueue_with_id(EntryId::from(*id), Operation::log_workout("pushups", amount))
                .await
                .unwrap();
        }
    }

    fn completed(outcome: RunOutcome) -> SyncReport {
        match outcome {
            RunOutcome::Completed(report) => report,
            RunOutcome::AlreadyRunning => panic!("run did not happen"),
        }
    }

    fn rejected(status: u16, message: &str) -> SendError {
        SendError::from_status(status, message)
    }

    #[tokio::test]
    async fn test_drains_in_queue_order() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a", "b", "c"]).await;
        let transport = Arc::new(ScriptedTransport::default());

        let report = completed(engine(&store, transport.clone()).run(Trigger::Manual).await.unwrap());

        assert_eq!(transport.sent_ids(), vec!["a", "b", "c"]);
        assert_eq!(report.synced, 3);
        assert_eq!(report.remaining, 0);
        assert!(report.halt.is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sends_token_and_key() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["w1"]).await;
        let transport = Arc::new(ScriptedTransport::default());

        engine(&store, transport.clone()).run(Trigger::Manual).await.unwrap();

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![("w1".to_string(), Some("token".to_string()))]);
    }

    #[tokio::test]
    async fn test_transient_failure_halts_and_keeps_order() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a", "b", "c"]).await;
        let transport = Arc::new(ScriptedTransport::with_script(vec![
            Ok(()),
            Err(SendError::Timeout),
        ]));

        let report = completed(engine(&store, transport.clone()).run(Trigger::Manual).await.unwrap());

        assert_eq!(transport.sent_ids(), vec!["a", "b"]);
        assert_eq!(report.synced, 1);
        assert_eq!(report.remaining, 2);
        assert!(matches!(report.halt, Some(HaltReason::Transient { ref id, .. }) if id.as_str() == "b"));

        let pending = store.list_pending().await.unwrap();
        let ids: Vec<_> = pending.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("request timed out"));

        let engine = engine(&store, transport.clone());
        let report = completed(engine.run(Trigger::Manual).await.unwrap());

        assert_eq!(transport.sent_ids(), vec!["a", "b", "b", "c"]);
        assert_eq!(report.synced, 2);
        assert!(report.halt.is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejection_does_not_block_later_entries() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a", "b", "c"]).await;
        let transport = Arc::new(ScriptedTransport::with_script(vec![
            Err(rejected(422, "amount must be positive")),
        ]));
        let notifier = Arc::new(RecordingNotifier::default());

        let report = completed(
            engine(&store, transport.clone())
                .with_notifier(notifier.clone())
                .run(Trigger::Manual)
                .await
                .unwrap(),
        );

        assert_eq!(transport.sent_ids(), vec!["a", "b", "c"]);
        assert_eq!(report.synced, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].id.as_str(), "a");
        assert_eq!(report.rejected[0].status, 422);
        assert_eq!(store.count().await.unwrap(), 0);

        let warnings = notifier.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("10 pushups"));
        assert_eq!(
            notifier.summaries.lock().unwrap().as_slice(),
            ["2 synced, 1 rejected"]
        );
    }

    #[tokio::test]
    async fn test_scenario_w1_w2_w3() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["w1", "w2", "w3"]).await;
        let transport = Arc::new(ScriptedTransport::with_script(vec![
            Ok(()),
            Err(rejected(400, "unknown exercise")),
            Err(SendError::Timeout),
        ]));
        let mut cache = MockCacheInvalidator::new();
        cache
            .expect_invalidate()
            .withf(|scopes| scopes.len() == 3)
            .times(1)
            .returning(|_| Ok(()));

        let report = completed(
            engine(&store, transport)
                .with_cache_invalidator(Arc::new(cache))
                .run(Trigger::ConnectivityRestored)
                .await
                .unwrap(),
        );

        assert_eq!(report.synced, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.remaining, 1);
        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.as_str(), "w3");
    }

    #[tokio::test]
    async fn test_no_cache_invalidation_without_success() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a"]).await;
        let transport = Arc::new(ScriptedTransport::with_script(vec![Err(SendError::Network(
            "connection refused".to_string(),
        ))]));
        let mut cache = MockCacheInvalidator::new();
        cache.expect_invalidate().times(0);

        engine(&store, transport)
            .with_cache_invalidator(Arc::new(cache))
            .run(Trigger::Manual)
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lost_response_converges_once() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a", "b"]).await;
        let server = Arc::new(DedupingServer {
            flaky: Some("a".to_string()),
            ..DedupingServer::default()
        });
        let engine = engine(&store, server.clone());

        let first = completed(engine.run(Trigger::Manual).await.unwrap());
        assert_eq!(first.synced, 0);
        assert_eq!(store.count().await.unwrap(), 2);

        let second = completed(engine.run(Trigger::Manual).await.unwrap());
        assert_eq!(second.synced, 2);
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(server.applied.lock().unwrap().as_slice(), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_credential_provider_failure_aborts_without_attempt() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a", "b"]).await;
        let transport = Arc::new(ScriptedTransport::default());
        let mut credentials = MockCredentialProvider::new();
        credentials
            .expect_access_token()
            .times(1)
            .returning(|| Err(RepsyncError::Credentials("no session".to_string())));

        let engine = SyncEngine::new(store.clone(), transport.clone(), Arc::new(credentials))
            .with_config(fast_config());
        let report = completed(engine.run(Trigger::Manual).await.unwrap());

        assert!(transport.sent_ids().is_empty());
        assert!(matches!(report.halt, Some(HaltReason::Credentials { .. })));
        assert!(report.summary_line().contains("will retry when back online"));

        let head = store.get(&EntryId::from("a")).await.unwrap().unwrap();
        assert_eq!(head.status, EntryStatus::Pending);
        assert_eq!(head.attempts, 0);
    }

    #[tokio::test]
    async fn test_unauthorized_response_reverts_entry() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a", "b"]).await;
        let transport = Arc::new(ScriptedTransport::with_script(vec![Err(rejected(
            401,
            "token expired",
        ))]));

        let report = completed(engine(&store, transport.clone()).run(Trigger::Manual).await.unwrap());

        assert_eq!(transport.sent_ids(), vec!["a"]);
        assert!(matches!(report.halt, Some(HaltReason::Credentials { .. })));
        assert_eq!(store.count().await.unwrap(), 2);
        let head = store.get(&EntryId::from("a")).await.unwrap().unwrap();
        assert_eq!(head.attempts, 0);
    }

    #[tokio::test]
    async fn test_periodic_trigger_respects_backoff() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a"]).await;
        store.mark_in_flight(&EntryId::from("a")).await.unwrap();
        store.mark_pending(&EntryId::from("a"), "timeout").await.unwrap();
        let transport = Arc::new(ScriptedTransport::default());
        let engine = engine(&store, transport.clone());

        let report = completed(engine.run(Trigger::Periodic).await.unwrap());
        assert!(matches!(report.halt, Some(HaltReason::Backoff { .. })));
        assert!(transport.sent_ids().is_empty());

        let report = completed(engine.run(Trigger::Manual).await.unwrap());
        assert_eq!(report.synced, 1);
    }

    #[tokio::test]
    async fn test_reentrant_run_is_rejected() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a"]).await;
        let transport = Arc::new(GatedTransport::default());
        let engine = Arc::new(engine(&store, transport.clone()));
        let mut syncing = engine.subscribe_syncing();

        let background = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.run(Trigger::Startup).await })
        };
        transport.started.notified().await;

        assert!(engine.is_syncing());
        assert!(*syncing.borrow_and_update());
        assert_eq!(
            engine.run(Trigger::Manual).await.unwrap(),
            RunOutcome::AlreadyRunning
        );

        transport.release.notify_one();
        let report = completed(background.await.unwrap().unwrap());
        assert_eq!(report.synced, 1);
        assert!(!engine.is_syncing());
        assert!(!*engine.subscribe_syncing().borrow());
    }

    #[tokio::test]
    async fn test_guard_clears_after_storage_error() {
        let store = QueueStore::in_memory().unwrap();
        let engine = engine(&store, Arc::new(ScriptedTransport::default()));
        {
            let db = store.database_for_tests().await;
            db.connection().execute("DROP TABLE write_queue", []).unwrap();
        }

        assert!(engine.run(Trigger::Manual).await.is_err());
        assert!(!engine.is_syncing());
    }

    #[tokio::test]
    async fn test_storage_failure_mid_run_still_invalidates_cache() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a", "b"]).await;
        let transport = Arc::new(BreaksStorage {
            store: store.clone(),
            breaks_at: "b".to_string(),
        });
        let mut cache = MockCacheInvalidator::new();
        cache.expect_invalidate().times(1).returning(|_| Ok(()));

        let result = engine(&store, transport)
            .with_cache_invalidator(Arc::new(cache))
            .run(Trigger::Manual)
            .await;

        assert!(matches!(result, Err(RepsyncError::Database(_))));
    }

    #[tokio::test]
    async fn test_summary_only_for_multiple_entries() {
        let store = QueueStore::in_memory().unwrap();
        seed(&store, &["a"]).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine(&store, Arc::new(ScriptedTransport::default()))
            .with_notifier(notifier.clone());

        engine.run(Trigger::Manual).await.unwrap();
        assert!(notifier.summaries.lock().unwrap().is_empty());

        seed(&store, &["b", "c"]).await;
        engine.run(Trigger::Manual).await.unwrap();
        assert_eq!(notifier.summaries.lock().unwrap().as_slice(), ["2 synced"]);
    }

    #[test]
    fn test_config_windows_are_capped() {
        let sync = SyncConfig {
            backoff_base_secs: u64::MAX,
            backoff_max_secs: 10_000_000_000_000_000,
            ..SyncConfig::default()
        };
        let server = ServerConfig {
            request_timeout_secs: u64::MAX,
            ..ServerConfig::default()
        };

        let config = EngineConfig::from_config(&sync, &server);

        let cap = Duration::days(30);
        assert_eq!(config.backoff_base, cap);
        assert_eq!(config.backoff_max, cap);
        assert_eq!(config.stale_after, cap);
    }

    #[test]
    fn test_config_defaults_pass_through() {
        let config = EngineConfig::from_config(&SyncConfig::default(), &ServerConfig::default());
        assert_eq!(config.backoff_base, Duration::seconds(5));
        assert_eq!(config.backoff_max, Duration::seconds(300));
    }

    #[tokio::test]
    async fn test_empty_queue_run() {
        let store = QueueStore::in_memory().unwrap();
        let report = completed(
            engine(&store, Arc::new(ScriptedTransport::default()))
                .run(Trigger::Startup)
                .await
                .unwrap(),
        );
        assert_eq!(report.summary_line(), "Nothing to sync");
    }
}
