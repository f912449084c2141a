//! Single-flight update scheduling.
//!
//! An [`UpdateScheduler`] owns the debounced watcher for one root and a
//! [`RunGate`] in front of the update routine. Each debounce firing triggers
//! the gate: an idle gate starts a run, a busy gate only raises its rerun flag.
//! When a run settles the flag is consumed, so at most one extra run follows
//! however many triggers arrived meanwhile.

use crate::{
    error::{Error, Result},
    traits::{ChangeSource, PendingCallback, UpdateOptions, UpdateRoutine},
    types::PendingChangeState,
    watcher::DebouncedWatcher,
};

use docsync_config::{WatchPathsConfig, WatcherSettings};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What to do with the watcher when settings change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherAction {
    /// Create and subscribe a watcher
    Start,
    /// Dispose the active watcher
    Stop,
    /// Dispose and recreate with the new debounce window
    Restart,
    /// Leave everything as it is
    Noop,
}

impl WatcherAction {
    /// Lowercase name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Noop => "noop",
        }
    }
}

impl fmt::Display for WatcherAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide how to move from `previous` to `next` settings.
pub fn decide(previous: &WatcherSettings, next: &WatcherSettings) -> WatcherAction {
    match (previous.enabled, next.enabled) {
        (false, true) => WatcherAction::Start,
        (true, false) => WatcherAction::Stop,
        (true, true) if previous.debounce_ms != next.debounce_ms => WatcherAction::Restart,
        _ => WatcherAction::Noop,
    }
}

/// Counters describing what a scheduler has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Update runs started, reruns included
    pub runs_started: u64,
    /// Triggers that arrived while a run was in flight
    pub reruns_coalesced: u64,
    /// Runs that returned an error or panicked
    pub failures: u64,
}

#[derive(Debug, Default)]
struct GateState {
    in_flight: bool,
    rerun_requested: bool,
    stats: SchedulerStats,
}

/// Guarantees that the update routine never runs twice at once for one root.
pub struct RunGate {
    root: PathBuf,
    routine: Arc<dyn UpdateRoutine>,
    options: UpdateOptions,
    runtime: Handle,
    state: Mutex<GateState>,
    idle: watch::Sender<bool>,
}

impl RunGate {
    fn new(
        root: PathBuf,
        routine: Arc<dyn UpdateRoutine>,
        options: UpdateOptions,
        runtime: Handle,
    ) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            root,
            routine,
            options,
            runtime,
            state: Mutex::new(GateState::default()),
            idle,
        }
    }

    /// Start a run, or request a rerun if one is in flight.
    pub fn trigger(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.in_flight {
                state.rerun_requested = true;
                state.stats.reruns_coalesced += 1;
                debug!("Update already running for {}, rerun requested", self.root.display());
                return;
            }
            state.in_flight = true;
            self.idle.send_replace(false);
        }

        let gate = Arc::clone(self);
        self.runtime.spawn(async move { gate.drive().await });
    }

    async fn drive(&self) {
        loop {
            self.state.lock().stats.runs_started += 1;
            debug!("Starting update for {}", self.root.display());

            let outcome = AssertUnwindSafe(self.routine.run_update(&self.root, self.options))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => debug!("Update finished for {}", self.root.display()),
                Ok(Err(e)) => {
                    warn!("Update failed for {}: {:#}", self.root.display(), e);
                    self.state.lock().stats.failures += 1;
                }
                Err(_) => {
                    warn!("Update panicked for {}", self.root.display());
                    self.state.lock().stats.failures += 1;
                }
            }

            if !self.settle() {
                break;
            }
            info!("Running coalesced update for {}", self.root.display());
        }
    }

    /// Consume the rerun flag. Returns whether another run must start.
    fn settle(&self) -> bool {
        let mut state = self.state.lock();
        if state.rerun_requested {
            state.rerun_requested = false;
            return true;
        }
        state.in_flight = false;
        self.idle.send_replace(true);
        false
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> SchedulerStats {
        self.state.lock().stats
    }

    /// Resolve once no run is in flight.
    pub async fn wait_idle(&self) {
        let mut idle = self.idle.subscribe();
        let _ = idle.wait_for(|is_idle| *is_idle).await;
    }
}

impl fmt::Debug for RunGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RunGate")
            .field("root", &self.root)
            .field("in_flight", &state.in_flight)
            .field("rerun_requested", &state.rerun_requested)
            .finish()
    }
}

/// Ties watcher lifecycle, user settings and the update routine together for one root.
pub struct UpdateScheduler {
    root: PathBuf,
    paths: WatchPathsConfig,
    source: Arc<dyn ChangeSource>,
    runtime: Handle,
    gate: Arc<RunGate>,
    observer: Option<PendingCallback>,
    settings: Mutex<WatcherSettings>,
    watcher: Mutex<Option<DebouncedWatcher>>,
}

impl UpdateScheduler {
    /// Create a scheduler with watching disabled.
    ///
    /// Watcher-triggered runs receive [`UpdateOptions::from_watcher`].
    pub fn new(
        root: impl Into<PathBuf>,
        paths: WatchPathsConfig,
        source: Arc<dyn ChangeSource>,
        routine: Arc<dyn UpdateRoutine>,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Internal(format!("Update scheduler needs a Tokio runtime: {}", e)))?;
        let root = root.into();

        Ok(Self {
            gate: Arc::new(RunGate::new(
                root.clone(),
                routine,
                UpdateOptions::from_watcher(),
                runtime.clone(),
            )),
            root,
            paths,
            source,
            runtime,
            observer: None,
            settings: Mutex::new(WatcherSettings::default()),
            watcher: Mutex::new(None),
        })
    }

    /// Also report every debounce settlement to `observer`.
    pub fn with_pending_observer(mut self, observer: PendingCallback) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The monitored root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Settings currently in effect.
    pub fn settings(&self) -> WatcherSettings {
        *self.settings.lock()
    }

    /// Apply new settings and return the action taken.
    ///
    /// Callable from any thread. If subscribing fails the watcher stays
    /// stopped and the scheduler records itself as disabled, so re-applying
    /// enabled settings retries.
    pub fn apply_settings(&self, next: WatcherSettings) -> Result<WatcherAction> {
        let mut current = self.settings.lock();
        let action = decide(&current, &next);

        match action {
            WatcherAction::Start | WatcherAction::Restart => {
                self.dispose_watcher();
                let watcher = self.build_watcher(&next);
                if let Err(e) = watcher.start(std::slice::from_ref(&self.root)) {
                    warn!("Watcher for {} failed to start: {}", self.root.display(), e);
                    *current = WatcherSettings::disabled(next.debounce_ms);
                    return Err(e);
                }
                *self.watcher.lock() = Some(watcher);
                info!(
                    "Watcher {} for {} ({}ms)",
                    if action == WatcherAction::Start { "started" } else { "restarted" },
                    self.root.display(),
                    next.debounce_ms
                );
            }
            WatcherAction::Stop => {
                self.dispose_watcher();
                info!("Watcher stopped for {}", self.root.display());
            }
            WatcherAction::Noop => {}
        }

        *current = next;
        Ok(action)
    }

    fn build_watcher(&self, settings: &WatcherSettings) -> DebouncedWatcher {
        let gate = Arc::downgrade(&self.gate);
        let observer = self.observer.clone();
        let on_pending: PendingCallback = Arc::new(move |state: PendingChangeState| {
            if let Some(observer) = &observer {
                observer(state);
            }
            if let Some(gate) = gate.upgrade() {
                gate.trigger();
            }
        });

        DebouncedWatcher::with_runtime(
            self.paths.clone(),
            settings.debounce(),
            self.source.clone(),
            on_pending,
            self.runtime.clone(),
        )
    }

    fn dispose_watcher(&self) {
        let old = self.watcher.lock().take();
        if let Some(watcher) = old {
            watcher.stop();
        }
    }

    /// Whether a watcher is active.
    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Trigger a run through the same single-flight gate the watcher uses.
    pub fn run_now(&self) {
        self.gate.trigger();
    }

    /// Feed a raw change to the active watcher. Returns whether it was recorded.
    pub fn record_change(&self, path: impl AsRef<Path>) -> bool {
        match self.watcher.lock().as_ref() {
            Some(watcher) => watcher.record_change(path),
            None => false,
        }
    }

    /// Pending changes of the active watcher, empty when stopped.
    pub fn pending_changes(&self) -> PendingChangeState {
        self.watcher
            .lock()
            .as_ref()
            .map(DebouncedWatcher::pending_changes)
            .unwrap_or_default()
    }

    /// Clear the active watcher's pending changes.
    pub fn clear_pending_changes(&self) {
        if let Some(watcher) = self.watcher.lock().as_ref() {
            watcher.clear_pending_changes();
        }
    }

    /// Counters for this scheduler.
    pub fn stats(&self) -> SchedulerStats {
        self.gate.stats()
    }

    /// Whether an update run is in flight.
    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Resolve once no update run is in flight.
    pub async fn wait_idle(&self) {
        self.gate.wait_idle().await
    }
}

impl fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("root", &self.root)
            .field("settings", &self.settings())
            .field("watching", &self.is_watching())
            .field("gate", &self.gate)
            .finish()
    }
}

/// Result of updating one root in a batch.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// The root that was updated
    pub root: PathBuf,
    /// The failure, if the update did not succeed
    pub error: Option<anyhow::Error>,
}

impl UpdateOutcome {
    /// Whether the update succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Update every root in order, one at a time.
///
/// `options` is passed to each run unchanged. A failing root does not stop
/// the batch.
///
/// Runs call `routine` directly and bypass every [`UpdateScheduler`] gate, so
/// a batch run may overlap a watcher-triggered run of the same root. Callers
/// that need exclusion should disable watching first and
/// [`UpdateScheduler::wait_idle`] before starting the batch.
pub async fn update_all(
    routine: &dyn UpdateRoutine,
    roots: &[PathBuf],
    options: UpdateOptions,
) -> Vec<UpdateOutcome> {
    let mut outcomes = Vec::with_capacity(roots.len());
    for root in roots {
        let error = routine.run_update(root, options).await.err();
        if let Some(e) = &error {
            warn!("Update failed for {}: {:#}", root.display(), e);
        }
        outcomes.push(UpdateOutcome {
            root: root.clone(),
            error,
        });
    }
    info!(
        "Updated {} roots, {} failed",
        outcomes.len(),
        outcomes.iter().filter(|o| !o.is_ok()).count()
    );
    outcomes
}
