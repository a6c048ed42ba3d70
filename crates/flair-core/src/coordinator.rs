// ── State Coordinator ──
//
// Owns the cached snapshot for one Flair account. Polls on a fixed
// interval, coalesces overlapping refreshes into one remote fetch,
// serialises writes through a command channel and publishes every
// change through the DataStore.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, Notify, RwLock, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{CommandEnvelope, LocalPatch, WritePlan};
use crate::config::{ConnectionConfig, CoordinatorConfig, Credentials, UnitSystem};
use crate::error::{CoreError, FailureKind};
use crate::model::{Category, Snapshot};
use crate::remote::RemoteState;
use crate::store::DataStore;
use crate::stream::SnapshotStream;
use crate::views::{self, Entity, EntityAction, EntityState, NoticeLog};

const COMMAND_CHANNEL_SIZE: usize = 64;

type SharedRefresh = Shared<BoxFuture<'static, Result<Arc<Snapshot>, CoreError>>>;

// ── SyncStatus ───────────────────────────────────────────────────

/// Health of the coordinator as observed by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    /// No refresh has completed yet.
    Initializing,
    Healthy,
    /// The last refresh failed; the previous snapshot is still served.
    Degraded {
        consecutive_failures: u32,
        kind: FailureKind,
        message: String,
    },
    /// Credentials were rejected. Polling is paused until
    /// [`Coordinator::reauthenticate`] succeeds.
    NeedsReauth { message: String },
    Stopped,
}

impl SyncStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn needs_reauth(&self) -> bool {
        matches!(self, Self::NeedsReauth { .. })
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// The single owner of remote Flair state for one account.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Every entity view reads
/// from the same snapshot and every write goes through
/// [`execute()`](Self::execute).
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    store: Arc<DataStore>,
    remote: RwLock<Arc<dyn RemoteState>>,
    status: Arc<watch::Sender<SyncStatus>>,
    in_flight: Mutex<Option<SharedRefresh>>,
    refresh_requested: Notify,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    running: AtomicBool,
    /// Set by the first `start()`; later calls are no-ops.
    started: AtomicBool,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    notices: NoticeLog,
}

impl Coordinator {
    /// Create a coordinator around `remote`. Does NOT fetch anything --
    /// call [`start()`](Self::start) to load the first snapshot and spawn
    /// the background tasks.
    pub fn new(config: CoordinatorConfig, remote: Arc<dyn RemoteState>) -> Self {
        let (status, _) = watch::channel(SyncStatus::Initializing);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                store: Arc::new(DataStore::new()),
                remote: RwLock::new(remote),
                status: Arc::new(status),
                in_flight: Mutex::new(None),
                refresh_requested: Notify::new(),
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                running: AtomicBool::new(false),
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                notices: NoticeLog::new(),
            }),
        }
    }

    /// Build a `FlairClient` from `connection` and wrap it.
    pub fn connect(
        connection: &ConnectionConfig,
        config: CoordinatorConfig,
    ) -> Result<Self, CoreError> {
        let client = connection.build_client()?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Load the first snapshot and spawn the poller and command processor.
    ///
    /// The first refresh is mandatory: if it fails the error is returned
    /// and nothing is spawned. Starting an already started coordinator
    /// does nothing.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::CoordinatorStopped);
        }
        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("coordinator already started");
            return Ok(());
        }

        if let Err(e) = self.refresh().await {
            self.inner.started.store(false, Ordering::Release);
            return Err(e);
        }

        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let coordinator = self.clone();
            handles.push(tokio::spawn(command_processor_task(coordinator, rx)));
        }

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(poll_task(coordinator, interval, cancel)));
        }

        self.inner.running.store(true, Ordering::Release);
        info!(
            structures = self.inner.store.snapshot().structures.len(),
            poll_secs = interval.as_secs(),
            "coordinator started"
        );
        Ok(())
    }

    /// Stop polling, reject queued writes and drop the cached snapshot.
    pub async fn shutdown(&self) {
        self.inner.running.store(false, Ordering::Release);
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.store.clear();
        self.inner.status.send_replace(SyncStatus::Stopped);
        debug!("coordinator stopped");
    }

    /// One-shot: start, run closure, shut down.
    ///
    /// Polling is disabled since the closure only needs the first snapshot
    /// plus whatever it writes.
    pub async fn oneshot<F, Fut, T>(
        config: CoordinatorConfig,
        remote: Arc<dyn RemoteState>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let coordinator = Coordinator::new(cfg, remote);
        coordinator.start().await?;
        let result = f(coordinator.clone()).await;
        coordinator.shutdown().await;
        result
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Fetch a full snapshot and commit it.
    ///
    /// Concurrent callers share one remote fetch and all receive its
    /// outcome. On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        let pending = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) => {
                    debug!("joining in-flight refresh");
                    pending.clone()
                }
                None => {
                    let pending = self.begin_refresh().await;
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut slot = self.inner.in_flight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
            *slot = None;
        }
        result
    }

    async fn begin_refresh(&self) -> SharedRefresh {
        let remote = Arc::clone(&*self.inner.remote.read().await);
        let store = Arc::clone(&self.inner.store);
        let status = Arc::clone(&self.inner.status);
        let timeout = self.inner.config.request_timeout;

        fetch_and_commit(remote, store, status, timeout)
            .boxed()
            .shared()
    }

    /// Wake the poller for an early refresh without waiting on it.
    pub fn request_refresh_soon(&self) {
        debug!("early refresh requested");
        self.inner.refresh_requested.notify_one();
    }

    /// Swap in a new remote (typically freshly authenticated) and refresh.
    ///
    /// Clears a `NeedsReauth` status so polling resumes once the refresh
    /// succeeds.
    pub async fn reauthenticate(
        &self,
        remote: Arc<dyn RemoteState>,
    ) -> Result<Arc<Snapshot>, CoreError> {
        *self.inner.remote.write().await = remote;

        let stale = self.inner.in_flight.lock().await.take();
        if let Some(pending) = stale {
            let _ = pending.await;
        }

        self.inner.status.send_replace(SyncStatus::Initializing);
        info!("credentials replaced, refreshing");
        self.refresh().await
    }

    /// Rebuild the client from `credentials` (keeping the API URL and
    /// timeout of `connection`) and [`reauthenticate`](Self::reauthenticate).
    pub async fn reauthenticate_with(
        &self,
        connection: &ConnectionConfig,
        credentials: Credentials,
    ) -> Result<Arc<Snapshot>, CoreError> {
        let connection = ConnectionConfig {
            credentials,
            ..connection.clone()
        };
        let client = connection.build_client()?;
        self.reauthenticate(Arc::new(client)).await
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Run `plan` through the command processor.
    ///
    /// Mutations are sent in order; patches are applied only after every
    /// mutation succeeded, followed by an early refresh request.
    pub async fn execute(&self, plan: WritePlan) -> Result<(), CoreError> {
        if !self.inner.running.load(Ordering::Acquire) || self.inner.cancel.is_cancelled() {
            return Err(CoreError::CoordinatorStopped);
        }

        let (response_tx, response_rx) = oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope { plan, response_tx })
            .await
            .map_err(|_| CoreError::CoordinatorStopped)?;

        response_rx
            .await
            .map_err(|_| CoreError::CoordinatorStopped)?
    }

    /// Plan `action` against `entity` and execute it.
    pub async fn perform(
        &self,
        entity: &Entity,
        action: &EntityAction,
        units: UnitSystem,
    ) -> Result<(), CoreError> {
        let plan = views::plan(entity, &self.snapshot(), units, action)?;
        if plan.is_empty() {
            debug!(entity = %entity.unique_id, ?action, "nothing to write");
            return Ok(());
        }
        self.execute(plan).await
    }

    /// Overwrite fields of one cached record without a remote write.
    ///
    /// Returns `false` when the record is not in the current snapshot.
    /// The next full refresh replaces the patched values.
    pub fn apply_local_patch(
        &self,
        category: Category,
        device_id: &str,
        fields: Map<String, Value>,
    ) -> bool {
        let patch = LocalPatch {
            attributes: fields,
            ..LocalPatch::new(category, device_id)
        };
        self.inner.store.apply_patch(&patch)
    }

    async fn apply_plan(&self, plan: WritePlan) -> Result<(), CoreError> {
        let remote = Arc::clone(&*self.inner.remote.read().await);
        let timeout = self.inner.config.request_timeout;
        let total = plan.mutations.len();

        for (index, mutation) in plan.mutations.iter().enumerate() {
            let outcome = match tokio::time::timeout(timeout, remote.update(mutation)).await {
                Ok(result) => result,
                Err(_) => Err(CoreError::Timeout {
                    timeout_secs: timeout.as_secs(),
                }),
            };

            if let Err(e) = outcome {
                warn!(
                    error = %e,
                    category = %mutation.category,
                    device_id = %mutation.device_id,
                    step = index + 1,
                    total,
                    "write failed"
                );
                if e.is_auth() {
                    record_failure(&self.inner.status, &e);
                }
                if index > 0 {
                    self.request_refresh_soon();
                }
                return Err(e);
            }
        }

        for patch in &plan.patches {
            if !self.inner.store.apply_patch(patch) {
                debug!(
                    category = %patch.category,
                    device_id = %patch.device_id,
                    "patch target missing from snapshot"
                );
            }
        }
        self.request_refresh_soon();
        Ok(())
    }

    // ── Observation ──────────────────────────────────────────────

    /// The current snapshot. Never blocks on network activity.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn status_stream(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.store.last_full_refresh()
    }

    /// Whether the snapshot is older than `stale_after`.
    pub fn is_stale(&self) -> bool {
        let limit = self.inner.config.stale_after;
        if limit.is_zero() {
            return false;
        }
        match self.inner.store.data_age() {
            None => true,
            Some(age) => age.to_std().is_ok_and(|age| age > limit),
        }
    }

    /// Every entity the current snapshot yields.
    pub fn entities(&self) -> Vec<Entity> {
        views::discover(&self.snapshot())
    }

    /// Render `entity` from the current snapshot.
    ///
    /// A stale snapshot makes every entity unavailable.
    pub fn render(&self, entity: &Entity, units: UnitSystem) -> EntityState {
        let snapshot = self.snapshot();
        let mut state = views::render(entity, &snapshot, units);
        self.inner.notices.observe(entity, &snapshot, &state);
        if self.is_stale() {
            state.available = false;
        }
        state
    }

    fn needs_reauth(&self) -> bool {
        self.inner.status.borrow().needs_reauth()
    }
}

// ── Refresh pipeline ─────────────────────────────────────────────

async fn fetch_and_commit(
    remote: Arc<dyn RemoteState>,
    store: Arc<DataStore>,
    status: Arc<watch::Sender<SyncStatus>>,
    timeout: Duration,
) -> Result<Arc<Snapshot>, CoreError> {
    debug!("fetching snapshot");

    let fetched = match tokio::time::timeout(timeout, remote.get_state()).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout {
            timeout_secs: timeout.as_secs(),
        }),
    };
    let fetched = fetched.and_then(|snapshot| {
        if snapshot.is_empty() {
            Err(CoreError::EmptyResult)
        } else {
            Ok(snapshot)
        }
    });

    match fetched {
        Ok(snapshot) => {
            let snapshot = store.replace(snapshot);
            status.send_replace(SyncStatus::Healthy);
            debug!(
                structures = snapshot.structures.len(),
                devices = snapshot.device_count(),
                "snapshot refreshed"
            );
            Ok(snapshot)
        }
        Err(e) => {
            record_failure(&status, &e);
            Err(e)
        }
    }
}

/// Fold a failure into the status. `NeedsReauth` only clears on success.
fn record_failure(status: &watch::Sender<SyncStatus>, error: &CoreError) {
    status.send_modify(|current| {
        let next = match (error.kind(), &*current) {
            (FailureKind::Auth, _) => SyncStatus::NeedsReauth {
                message: error.to_string(),
            },
            (_, SyncStatus::NeedsReauth { .. }) => return,
            (kind, SyncStatus::Degraded {
                consecutive_failures,
                ..
            }) => SyncStatus::Degraded {
                consecutive_failures: consecutive_failures.saturating_add(1),
                kind,
                message: error.to_string(),
            },
            (kind, _) => SyncStatus::Degraded {
                consecutive_failures: 1,
                kind,
                message: error.to_string(),
            },
        };
        *current = next;
    });
}

// ── Background tasks ─────────────────────────────────────────────

/// Refresh on every tick, or earlier when asked. Paused while the
/// credentials are known to be bad.
async fn poll_task(coordinator: Coordinator, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = coordinator.inner.refresh_requested.notified() => {
                debug!("running requested refresh");
            }
            _ = ticker.tick() => {}
        }

        if coordinator.needs_reauth() {
            debug!("skipping refresh until re-authentication");
            continue;
        }
        if let Err(e) = coordinator.refresh().await {
            warn!(error = %e, kind = %e.kind(), "periodic refresh failed");
        }
    }
}

/// Apply write plans one at a time, in arrival order.
async fn command_processor_task(coordinator: Coordinator, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = coordinator.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = coordinator.apply_plan(envelope.plan).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_accumulate_while_degraded() {
        let (status, _) = watch::channel(SyncStatus::Healthy);
        let timeout = CoreError::Timeout { timeout_secs: 20 };

        record_failure(&status, &timeout);
        record_failure(&status, &timeout);

        match &*status.borrow() {
            SyncStatus::Degraded {
                consecutive_failures,
                kind,
                ..
            } => {
                assert_eq!(*consecutive_failures, 2);
                assert_eq!(*kind, FailureKind::Transient);
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn reauth_status_survives_transient_failures() {
        let (status, _) = watch::channel(SyncStatus::Healthy);

        record_failure(
            &status,
            &CoreError::AuthenticationFailed {
                message: "invalid_client".into(),
            },
        );
        record_failure(
            &status,
            &CoreError::ConnectionFailed {
                reason: "reset".into(),
            },
        );

        assert!(status.borrow().needs_reauth());
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(SyncStatus::Degraded {
            consecutive_failures: 1,
            kind: FailureKind::EmptyResult,
            message: "none".into(),
        })
        .unwrap_or_default();
        assert_eq!(json["state"], "degraded");
        assert_eq!(json["kind"], "empty_result");
    }
}
