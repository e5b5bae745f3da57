// ── Update coordinator ──
//
// Owns the device snapshot for one Flipr account. Runs the periodic
// refresh cycle, coalesces on-demand refreshes onto the in-flight cycle,
// routes Hub commands, and publishes state changes to subscribers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use flipr_api::FliprClient;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::CoordinatorConfig;
use crate::cycle;
use crate::error::CoreError;
use crate::model::{DeviceData, DeviceKind, DeviceRecord, HubMode};
use crate::source::DeviceSource;
use crate::store::{Snapshot, SnapshotStore};
use crate::stream::SnapshotStream;

const COMMAND_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

type SharedCycle = Shared<BoxFuture<'static, Result<(), CoreError>>>;

// ── CoordinatorState ─────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No snapshot yet. Left only by a successful first refresh.
    Uninitialized,
    Refreshing,
    Ready,
    /// The last cycle failed; the previous snapshot is still served.
    Failed { reason: String },
    Stopped,
}

// ── CoordinatorEvent ─────────────────────────────────────────────

/// Notifications broadcast alongside snapshot changes.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// A refresh cycle installed a new snapshot.
    SnapshotUpdated { devices: usize },
    /// A confirmed command patched one record.
    DevicePatched { id: String },
    /// A refresh cycle failed after setup.
    UpdateFailed { reason: String },
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Every entity holds a
/// clone; reads are served from the cached snapshot and never touch the
/// network.
pub struct Coordinator<S: DeviceSource = FliprClient> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S: DeviceSource> Clone for Coordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<S> {
    config: CoordinatorConfig,
    source: ArcSwapOption<S>,
    store: SnapshotStore,
    state: watch::Sender<CoordinatorState>,
    event_tx: broadcast::Sender<CoordinatorEvent>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: tokio::sync::Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    inflight: Mutex<Option<SharedCycle>>,
    cancel: CancellationToken,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<S: DeviceSource> Coordinator<S> {
    /// Create a coordinator with an empty snapshot. Does NOT fetch --
    /// call [`setup()`](Self::setup) to run the first refresh and start
    /// background tasks.
    pub fn new(config: CoordinatorConfig, source: Arc<S>) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Uninitialized);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                source: ArcSwapOption::from(Some(source)),
                store: SnapshotStore::new(),
                state,
                event_tx,
                command_tx,
                command_rx: tokio::sync::Mutex::new(Some(command_rx)),
                inflight: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: tokio::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run the mandatory first refresh, then spawn the command processor
    /// and (if the interval is non-zero) the periodic refresh task.
    ///
    /// A failing first refresh returns [`CoreError::SetupFailed`] and
    /// leaves the coordinator uninitialized.
    pub async fn setup(&self) -> Result<(), CoreError> {
        if self.state() == CoordinatorState::Stopped {
            return Err(CoreError::CoordinatorStopped);
        }

        debug!("running first refresh");
        if let Err(e) = self.request_refresh().await {
            let source = match e {
                CoreError::UpdateFailed { source } => source,
                other => Box::new(other),
            };
            warn!(error = %source, "first refresh failed");
            return Err(CoreError::SetupFailed { source });
        }

        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let coordinator = self.clone();
            handles.push(tokio::spawn(command_processor_task(coordinator, rx)));

            let interval = self.inner.config.refresh_interval;
            if !interval.is_zero() {
                let coordinator = self.clone();
                let cancel = self.inner.cancel.clone();
                handles.push(tokio::spawn(refresh_task(coordinator, interval, cancel)));
            }
        }

        info!(devices = self.inner.store.snapshot().len(), "coordinator ready");
        Ok(())
    }

    /// Stop background tasks and release the upstream client.
    ///
    /// The last snapshot stays readable.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.source.store(None);
        self.inner.state.send_replace(CoordinatorState::Stopped);
        info!("coordinator stopped");
    }

    /// One-shot: setup, run closure, shutdown.
    ///
    /// Disables the periodic timer since only a single exchange is needed.
    pub async fn oneshot<F, Fut, T>(
        config: CoordinatorConfig,
        source: Arc<S>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator<S>) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let cfg = CoordinatorConfig {
            refresh_interval: Duration::ZERO,
            refresh_after_command: false,
            ..config
        };

        let coordinator = Coordinator::new(cfg, source);
        coordinator.setup().await?;
        let result = f(coordinator.clone()).await;
        coordinator.shutdown().await;
        result
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run a refresh cycle, or join the one already in flight.
    ///
    /// Every caller joining the same cycle receives the same outcome.
    /// Failures come back as [`CoreError::UpdateFailed`]; the previous
    /// snapshot stays installed.
    pub async fn request_refresh(&self) -> Result<(), CoreError> {
        let cycle = {
            let mut slot = self
                .inner
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(cycle) = slot.as_ref() {
                debug!("joining in-flight refresh");
                cycle.clone()
            } else {
                let cycle = self.spawn_cycle();
                *slot = Some(cycle.clone());
                cycle
            }
        };
        cycle.await
    }

    /// Spawn a cycle task. The task clears the in-flight slot before it
    /// completes, so late callers start a new cycle instead of reading a
    /// finished one.
    fn spawn_cycle(&self) -> SharedCycle {
        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            let _slot = ClearSlot(&coordinator.inner.inflight);
            coordinator.run_cycle().await
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(CoreError::Internal(format!("refresh task failed: {e}"))))
        }
        .boxed()
        .shared()
    }

    async fn run_cycle(&self) -> Result<(), CoreError> {
        let initialized = !matches!(self.state(), CoordinatorState::Uninitialized);
        let config = &self.inner.config;
        let started = tokio::time::Instant::now();

        let outcome = {
            let source = self.source()?;
            if initialized {
                self.set_state(CoordinatorState::Refreshing);
            }
            let prior = self.inner.store.snapshot();

            tokio::time::timeout(
                config.cycle_timeout,
                cycle::collect(source.as_ref(), &prior, config),
            )
            .await
            .unwrap_or(Err(CoreError::Timeout {
                timeout_secs: config.cycle_timeout.as_secs(),
            }))
        };

        match outcome {
            Ok(next) => {
                let installed = self.inner.store.install(next);
                self.set_state(CoordinatorState::Ready);
                let _ = self.inner.event_tx.send(CoordinatorEvent::SnapshotUpdated {
                    devices: installed.len(),
                });
                debug!(
                    devices = installed.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "refresh complete"
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "refresh failed, keeping last snapshot");
                if initialized {
                    let reason = e.to_string();
                    self.set_state(CoordinatorState::Failed {
                        reason: reason.clone(),
                    });
                    let _ = self
                        .inner
                        .event_tx
                        .send(CoordinatorEvent::UpdateFailed { reason });
                }
                Err(CoreError::UpdateFailed {
                    source: Box::new(e),
                })
            }
        }
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against a Hub.
    ///
    /// The target must be a Hub in the current snapshot; otherwise a
    /// precondition error is returned before any upstream call.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self.state() == CoordinatorState::Stopped {
            return Err(CoreError::CoordinatorStopped);
        }
        self.ensure_hub(cmd.device_id())?;

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::CoordinatorStopped)?;

        rx.await.map_err(|_| CoreError::CoordinatorStopped)?
    }

    /// Switch a Hub relay. Returns the state upstream reports, which
    /// differs from `on` when the Hub did not comply.
    pub async fn set_hub_state(&self, id: &str, on: bool) -> Result<bool, CoreError> {
        let CommandResult::Hub { reported, .. } = self
            .execute(Command::SetHubState {
                id: id.to_owned(),
                on,
            })
            .await?;
        Ok(reported.state)
    }

    /// Change a Hub mode. Returns the mode upstream reports.
    pub async fn set_hub_mode(&self, id: &str, mode: HubMode) -> Result<HubMode, CoreError> {
        let CommandResult::Hub { reported, .. } = self
            .execute(Command::SetHubMode {
                id: id.to_owned(),
                mode,
            })
            .await?;
        Ok(reported.mode)
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> CoordinatorState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to lifecycle state changes.
    pub fn state_changes(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to the event broadcast.
    pub fn events(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    // ── Snapshot accessors (delegate to SnapshotStore) ───────────

    pub fn get_snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    /// Look up one record. `None` before the first refresh.
    pub fn find(&self, id: &str) -> Option<Arc<DeviceRecord>> {
        self.inner.store.find(id)
    }

    /// Ids of every record of `kind`. Empty before the first refresh.
    pub fn list_ids(&self, kind: DeviceKind) -> Vec<String> {
        self.inner.store.ids(kind)
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn source(&self) -> Result<Arc<S>, CoreError> {
        self.inner
            .source
            .load_full()
            .ok_or(CoreError::CoordinatorStopped)
    }

    /// Set the lifecycle state unless the coordinator has been stopped.
    fn set_state(&self, next: CoordinatorState) {
        self.inner.state.send_if_modified(|current| {
            if *current == CoordinatorState::Stopped || *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn ensure_hub(&self, id: &str) -> Result<(), CoreError> {
        match self.inner.store.find(id) {
            None => Err(CoreError::DeviceNotFound {
                identifier: id.to_owned(),
            }),
            Some(record) if record.kind() != DeviceKind::Hub => Err(CoreError::NotAHub {
                identifier: id.to_owned(),
            }),
            Some(_) => Ok(()),
        }
    }
}

/// Empties the in-flight slot when dropped, even if the cycle panics.
struct ClearSlot<'a>(&'a Mutex<Option<SharedCycle>>);

impl Drop for ClearSlot<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically trigger a refresh cycle.
async fn refresh_task<S: DeviceSource>(
    coordinator: Coordinator<S>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = coordinator.request_refresh() => {
                        // already logged by the cycle itself
                        if let Err(e) = result {
                            debug!(error = %e, "periodic refresh failed");
                        }
                    }
                }
            }
        }
    }
}

/// Process commands from the mpsc channel, one at a time.
async fn command_processor_task<S: DeviceSource>(
    coordinator: Coordinator<S>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
) {
    let cancel = coordinator.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&coordinator, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

/// Issue the write upstream and patch the snapshot if the Hub confirmed it.
async fn route_command<S: DeviceSource>(
    coordinator: &Coordinator<S>,
    cmd: Command,
) -> Result<CommandResult, CoreError> {
    coordinator.ensure_hub(cmd.device_id())?;

    let reported = {
        let source = coordinator.source()?;
        match &cmd {
            Command::SetHubState { id, on } => {
                debug!(device = %id, on, "setting hub state");
                source.set_hub_state(id, *on).await?
            }
            Command::SetHubMode { id, mode } => {
                debug!(device = %id, %mode, "setting hub mode");
                source.set_hub_mode(id, *mode).await?
            }
        }
    };

    let confirmed = cmd.is_confirmed_by(&reported);
    if !confirmed {
        warn!(
            device = %cmd.device_id(),
            ?cmd,
            ?reported,
            "hub reported a different state than requested, snapshot left unchanged"
        );
        return Ok(CommandResult::Hub {
            reported,
            confirmed,
        });
    }

    let record = DeviceRecord::fresh(cmd.device_id(), DeviceData::Hub(reported));
    if coordinator.inner.store.patch(record) {
        let _ = coordinator.inner.event_tx.send(CoordinatorEvent::DevicePatched {
            id: cmd.device_id().to_owned(),
        });

        if coordinator.inner.config.refresh_after_command {
            let follow_up = coordinator.clone();
            tokio::spawn(async move {
                if let Err(e) = follow_up.request_refresh().await {
                    debug!(error = %e, "post-command refresh failed");
                }
            });
        }
    }

    Ok(CommandResult::Hub {
        reported,
        confirmed,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::HubState;
    use crate::testing::MockSource;

    fn test_config() -> CoordinatorConfig {
        CoordinatorConfig {
            refresh_interval: Duration::ZERO,
            refresh_after_command: false,
            ..CoordinatorConfig::default()
        }
    }

    async fn ready(
        config: CoordinatorConfig,
        probes: &[&str],
        hubs: &[&str],
    ) -> (Arc<MockSource>, Coordinator<MockSource>) {
        let source = Arc::new(MockSource::new(probes, hubs));
        let coordinator = Coordinator::new(config, Arc::clone(&source));
        coordinator.setup().await.unwrap();
        (source, coordinator)
    }

    fn hub_state(coordinator: &Coordinator<MockSource>, id: &str) -> HubState {
        *coordinator.find(id).unwrap().data.as_hub().unwrap()
    }

    // ── Setup ───────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn setup_populates_snapshot() {
        let (source, coordinator) = ready(test_config(), &["P1"], &["H1"]).await;

        assert_eq!(coordinator.state(), CoordinatorState::Ready);
        assert_eq!(coordinator.list_ids(DeviceKind::Probe), vec!["P1"]);
        assert_eq!(coordinator.list_ids(DeviceKind::Hub), vec!["H1"]);
        assert_eq!(MockSource::count(&source.discover_calls), 1);
        assert_eq!(MockSource::count(&source.probe_calls), 1);
        assert_eq!(MockSource::count(&source.hub_calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_are_empty_before_first_refresh() {
        let source = Arc::new(MockSource::new(&["P1"], &[]));
        let coordinator = Coordinator::new(test_config(), source);

        assert_eq!(coordinator.state(), CoordinatorState::Uninitialized);
        assert!(coordinator.find("P1").is_none());
        assert!(coordinator.list_ids(DeviceKind::Probe).is_empty());
        assert!(coordinator.get_snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_first_refresh_is_fatal() {
        let source = Arc::new(MockSource::new(&["P1"], &[]));
        source.fail_discovery(Some(CoreError::AuthenticationFailed {
            message: "bad password".into(),
        }));
        let coordinator = Coordinator::new(test_config(), Arc::clone(&source));

        let err = coordinator.setup().await.unwrap_err();

        assert!(matches!(err, CoreError::SetupFailed { .. }));
        assert!(matches!(
            err.root_cause(),
            CoreError::AuthenticationFailed { .. }
        ));
        assert_eq!(coordinator.state(), CoordinatorState::Uninitialized);
        assert!(coordinator.get_snapshot().is_empty());
    }

    // ── Refresh cycle ───────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn cadence_scenario() {
        let (source, coordinator) = ready(test_config(), &["P1"], &["H1"]).await;
        let h1_first = coordinator.find("H1").unwrap().last_read;

        tokio::time::advance(Duration::from_secs(200)).await;
        coordinator.request_refresh().await.unwrap();
        assert_eq!(MockSource::count(&source.probe_calls), 1);
        assert_eq!(MockSource::count(&source.hub_calls), 1);
        assert_eq!(coordinator.find("H1").unwrap().last_read, h1_first);

        tokio::time::advance(Duration::from_secs(200)).await;
        coordinator.request_refresh().await.unwrap();
        assert_eq!(MockSource::count(&source.probe_calls), 1);
        assert_eq!(MockSource::count(&source.hub_calls), 2);
        assert!(coordinator.find("H1").unwrap().last_read > h1_first);
        assert_eq!(MockSource::count(&source.discover_calls), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_share_one_cycle() {
        let (source, coordinator) = ready(test_config(), &["P1"], &["H1"]).await;
        source.set_discover_delay(Duration::from_secs(5));

        let results = futures_util::future::join_all(
            (0..5).map(|_| coordinator.request_refresh()),
        )
        .await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(MockSource::count(&source.discover_calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn coalesced_callers_see_the_same_failure() {
        let (source, coordinator) = ready(test_config(), &["P1"], &[]).await;
        source.set_discover_delay(Duration::from_secs(5));
        source.fail_discovery(Some(CoreError::Api {
            message: "maintenance".into(),
            status: Some(503),
        }));

        let (a, b) = tokio::join!(coordinator.request_refresh(), coordinator.request_refresh());

        assert_eq!(a.unwrap_err().to_string(), b.unwrap_err().to_string());
        assert_eq!(MockSource::count(&source.discover_calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_discovery_keeps_last_snapshot() {
        let (source, coordinator) = ready(test_config(), &["P1"], &["H1"]).await;
        let before = coordinator.get_snapshot();
        let mut events = coordinator.events();

        source.fail_discovery(Some(CoreError::ConnectionFailed {
            url: "https://apis.goflipr.com".into(),
            reason: "dns".into(),
        }));
        let err = coordinator.request_refresh().await.unwrap_err();

        assert!(matches!(err, CoreError::UpdateFailed { .. }));
        assert!(Arc::ptr_eq(&before, &coordinator.get_snapshot()));
        assert!(matches!(
            coordinator.state(),
            CoordinatorState::Failed { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoordinatorEvent::UpdateFailed { .. }
        ));

        source.fail_discovery(None);
        coordinator.request_refresh().await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_fetch_discards_the_cycle() {
        let (source, coordinator) = ready(test_config(), &["P1", "P2"], &[]).await;
        let before = coordinator.get_snapshot();

        tokio::time::advance(Duration::from_secs(3600)).await;
        source.fail_probe(
            "P2",
            CoreError::Api {
                message: "survey unavailable".into(),
                status: Some(500),
            },
        );

        assert!(coordinator.request_refresh().await.is_err());
        assert!(Arc::ptr_eq(&before, &coordinator.get_snapshot()));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycle_times_out() {
        let (source, coordinator) = ready(test_config(), &["P1"], &[]).await;
        source.set_discover_delay(Duration::from_secs(200));

        let err = coordinator.request_refresh().await.unwrap_err();

        assert!(matches!(
            err.root_cause(),
            CoreError::Timeout { timeout_secs: 100 }
        ));
        assert_eq!(coordinator.list_ids(DeviceKind::Probe), vec!["P1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_drives_refresh() {
        let config = CoordinatorConfig {
            refresh_interval: Duration::from_secs(60),
            ..test_config()
        };
        let (source, coordinator) = ready(config, &["P1"], &[]).await;
        let mut stream = coordinator.subscribe();

        tokio::time::advance(Duration::from_secs(61)).await;
        stream.changed().await.unwrap();

        assert_eq!(MockSource::count(&source.discover_calls), 2);
        coordinator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_each_install() {
        let (_source, coordinator) = ready(test_config(), &["P1"], &[]).await;
        let mut stream = coordinator.subscribe();
        let mut events = coordinator.events();

        coordinator.request_refresh().await.unwrap();

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(
            events.recv().await.unwrap(),
            CoordinatorEvent::SnapshotUpdated { devices: 1 }
        );
    }

    // ── Commands ────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn confirmed_command_patches_snapshot() {
        let (_source, coordinator) = ready(test_config(), &[], &["H1"]).await;
        let mut events = coordinator.events();

        let reported = coordinator.set_hub_state("H1", true).await.unwrap();

        assert!(reported);
        let state = hub_state(&coordinator, "H1");
        assert!(state.state);
        assert_eq!(state.mode, HubMode::Manual);
        assert_eq!(
            events.recv().await.unwrap(),
            CoordinatorEvent::DevicePatched { id: "H1".into() }
        );

        let mode = coordinator.set_hub_mode("H1", HubMode::Planning).await.unwrap();
        assert_eq!(mode, HubMode::Planning);
        assert_eq!(hub_state(&coordinator, "H1").mode, HubMode::Planning);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_command_leaves_snapshot() {
        let (source, coordinator) = ready(test_config(), &[], &["H1"]).await;
        let before = coordinator.get_snapshot();
        source.override_writes(Some(HubState {
            state: false,
            mode: HubMode::Auto,
        }));

        let reported = coordinator.set_hub_state("H1", true).await.unwrap();

        assert!(!reported);
        assert!(Arc::ptr_eq(&before, &coordinator.get_snapshot()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_command_leaves_snapshot() {
        let (source, coordinator) = ready(test_config(), &[], &["H1"]).await;
        let before = coordinator.get_snapshot();
        source.fail_writes(Some(CoreError::Timeout { timeout_secs: 30 }));

        let err = coordinator.set_hub_mode("H1", HubMode::Manual).await.unwrap_err();

        assert!(matches!(err, CoreError::Timeout { .. }));
        assert!(Arc::ptr_eq(&before, &coordinator.get_snapshot()));
    }

    #[tokio::test(start_paused = true)]
    async fn commands_check_target_before_upstream() {
        let (source, coordinator) = ready(test_config(), &["P1"], &["H1"]).await;

        let missing = coordinator.set_hub_state("H9", true).await.unwrap_err();
        let probe = coordinator.set_hub_mode("P1", HubMode::Auto).await.unwrap_err();

        assert!(matches!(missing, CoreError::DeviceNotFound { .. }));
        assert!(matches!(probe, CoreError::NotAHub { .. }));
        assert!(missing.is_precondition_violation() && probe.is_precondition_violation());
        assert_eq!(source.write_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn command_triggers_follow_up_refresh() {
        let config = CoordinatorConfig {
            refresh_after_command: true,
            ..test_config()
        };
        let (source, coordinator) = ready(config, &[], &["H1"]).await;
        let mut events = coordinator.events();

        coordinator.set_hub_state("H1", true).await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            CoordinatorEvent::DevicePatched { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoordinatorEvent::SnapshotUpdated { .. }
        ));
        assert_eq!(MockSource::count(&source.discover_calls), 2);
        // freshly patched, so the follow-up cycle does not re-read it
        assert_eq!(MockSource::count(&source.hub_calls), 1);
        assert!(hub_state(&coordinator, "H1").state);
    }

    #[tokio::test(start_paused = true)]
    async fn patch_survives_concurrent_cycle() {
        let (source, coordinator) = ready(test_config(), &[], &["H1"]).await;
        source.set_discover_delay(Duration::from_secs(10));

        let background = coordinator.clone();
        let cycle = tokio::spawn(async move { background.request_refresh().await });
        // let the cycle capture its prior snapshot and block in discovery
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(coordinator.set_hub_state("H1", true).await.unwrap());
        cycle.await.unwrap().unwrap();

        assert!(hub_state(&coordinator, "H1").state);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_hub_read_does_not_undo_confirmed_command() {
        let (source, coordinator) = ready(test_config(), &[], &["H1"]).await;
        source.set_hub_read_delay(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(301)).await;

        let background = coordinator.clone();
        let cycle = tokio::spawn(async move { background.request_refresh().await });
        // the cycle has read state=false and is waiting on the response
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(MockSource::count(&source.hub_calls), 2);

        assert!(coordinator.set_hub_state("H1", true).await.unwrap());
        assert!(hub_state(&coordinator, "H1").state);

        cycle.await.unwrap().unwrap();
        assert!(hub_state(&coordinator, "H1").state);
    }

    // ── Shutdown ────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_source() {
        let (source, coordinator) = ready(test_config(), &["P1"], &["H1"]).await;

        coordinator.shutdown().await;

        assert_eq!(coordinator.state(), CoordinatorState::Stopped);
        assert_eq!(Arc::strong_count(&source), 1);
        assert_eq!(coordinator.get_snapshot().len(), 2);
        assert!(matches!(
            coordinator.request_refresh().await.unwrap_err(),
            CoreError::CoordinatorStopped
        ));
        assert!(matches!(
            coordinator.set_hub_state("H1", true).await.unwrap_err(),
            CoreError::CoordinatorStopped
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn oneshot_runs_closure_between_setup_and_shutdown() {
        let source = Arc::new(MockSource::new(&["P1"], &["H1"]));

        let ids = Coordinator::oneshot(CoordinatorConfig::default(), Arc::clone(&source), |c| async move {
            Ok(c.list_ids(DeviceKind::Hub))
        })
        .await
        .unwrap();

        assert_eq!(ids, vec!["H1"]);
        assert_eq!(Arc::strong_count(&source), 1);
    }
}
