//! Path-filtering, trailing-edge debounced change watcher.
//!
//! Raw notifications from a [`ChangeSource`] are classified by a
//! [`PathFilter`]; accepted paths join the pending set and restart the single
//! debounce timer. When the timer elapses the whole pending set is handed to
//! the observer. The set is not cleared by the emission.

use crate::{
    error::{Error, Result},
    filter::{FilterDecision, PathFilter},
    traits::{ChangeSource, PendingCallback, Subscription},
    types::PendingChangeState,
};

use docsync_config::WatchPathsConfig;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// The one debounce timer a watcher may have.
#[derive(Debug, Default)]
enum DebounceTimer {
    #[default]
    Idle,
    Pending {
        deadline: Instant,
        handle: JoinHandle<()>,
    },
}

impl DebounceTimer {
    fn cancel(&mut self) {
        if let Self::Pending { handle, .. } = std::mem::take(self) {
            handle.abort();
        }
    }
}

#[derive(Debug, Default)]
struct WatcherState {
    pending: PendingChangeState,
    timer: DebounceTimer,
    /// Bumped on every restart or cancel so a timer that lost an abort race is ignored.
    generation: u64,
    filters: Vec<PathFilter>,
}

impl WatcherState {
    /// Abort the live timer and invalidate one that already woke up.
    fn cancel_timer(&mut self) {
        self.timer.cancel();
        self.generation += 1;
    }
}

struct WatcherInner {
    debounce: Duration,
    runtime: Handle,
    on_pending: PendingCallback,
    state: Mutex<WatcherState>,
}

impl WatcherInner {
    fn classify(&self, path: &Path) -> FilterDecision {
        let state = self.state.lock();
        let mut decision = FilterDecision::OutsideRoot;
        for filter in &state.filters {
            decision = filter.classify(path);
            if decision != FilterDecision::OutsideRoot {
                break;
            }
        }
        decision
    }

    fn record(self: &Arc<Self>, path: &Path) -> bool {
        let rel = match self.classify(path) {
            FilterDecision::Accept(rel) => rel,
            other => {
                trace!("Ignoring change to {}: {:?}", path.display(), other);
                return false;
            }
        };

        let mut state = self.state.lock();
        state.pending.record(rel);
        self.restart_timer(&mut state);
        true
    }

    fn restart_timer(self: &Arc<Self>, state: &mut WatcherState) {
        state.cancel_timer();

        let generation = state.generation;
        let deadline = Instant::now() + self.debounce;
        let inner = Arc::downgrade(self);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = inner.upgrade() {
                inner.fire(generation);
            }
        });

        state.timer = DebounceTimer::Pending { deadline, handle };
    }

    fn fire(&self, generation: u64) {
        let pending = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.timer = DebounceTimer::Idle;
            state.pending.clone()
        };

        debug!(
            "Debounce elapsed with {} pending changes",
            pending.changed_paths.len()
        );
        (self.on_pending)(pending);
    }
}

/// Debounced watcher over one or more monitored roots.
///
/// Must be created inside a Tokio runtime; the timer runs on that runtime even
/// when the change source calls back from its own threads.
pub struct DebouncedWatcher {
    inner: Arc<WatcherInner>,
    paths: WatchPathsConfig,
    source: Arc<dyn ChangeSource>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl DebouncedWatcher {
    /// Create a watcher on the current Tokio runtime, not yet subscribed to anything.
    pub fn new(
        paths: WatchPathsConfig,
        debounce: Duration,
        source: Arc<dyn ChangeSource>,
        on_pending: PendingCallback,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Internal(format!("Debounced watcher needs a Tokio runtime: {}", e)))?;

        Ok(Self::with_runtime(paths, debounce, source, on_pending, runtime))
    }

    /// Create a watcher whose timers run on `runtime`.
    ///
    /// Usable from any thread.
    pub fn with_runtime(
        paths: WatchPathsConfig,
        debounce: Duration,
        source: Arc<dyn ChangeSource>,
        on_pending: PendingCallback,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                debounce,
                runtime,
                on_pending,
                state: Mutex::new(WatcherState::default()),
            }),
            paths,
            source,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Replace the monitored roots and subscribe to each of them.
    ///
    /// Old subscriptions are disposed first. The pending set is kept.
    pub fn start(&self, roots: &[PathBuf]) -> Result<()> {
        let filters = roots
            .iter()
            .map(|root| PathFilter::new(root, &self.paths))
            .collect::<Result<Vec<_>>>()?;

        self.unsubscribe();
        self.inner.state.lock().filters = filters;

        let mut subscriptions = Vec::with_capacity(roots.len());
        for root in roots {
            let inner: Weak<WatcherInner> = Arc::downgrade(&self.inner);
            let subscription = self.source.subscribe(
                root,
                Arc::new(move |path: PathBuf| {
                    if let Some(inner) = inner.upgrade() {
                        inner.record(&path);
                    }
                }),
            )?;
            subscriptions.push(subscription);
        }
        *self.subscriptions.lock() = subscriptions;

        info!(
            "Debounced watcher started on {} roots via {} ({}ms)",
            roots.len(),
            self.source.backend_type(),
            self.inner.debounce.as_millis()
        );
        Ok(())
    }

    /// Dispose all subscriptions and cancel the pending timer.
    pub fn stop(&self) {
        self.unsubscribe();
        self.inner.state.lock().cancel_timer();
        info!("Debounced watcher stopped");
    }

    fn unsubscribe(&self) {
        let old = std::mem::take(&mut *self.subscriptions.lock());
        for subscription in old {
            subscription.dispose();
        }
    }

    /// Record a raw change. Returns whether the path passed the filter.
    pub fn record_change(&self, path: impl AsRef<Path>) -> bool {
        self.inner.record(path.as_ref())
    }

    /// Forget every pending path and cancel the timer.
    pub fn clear_pending_changes(&self) {
        let mut state = self.inner.state.lock();
        state.pending.clear();
        state.cancel_timer();
    }

    /// Current accumulated state.
    pub fn pending_changes(&self) -> PendingChangeState {
        self.inner.state.lock().pending.clone()
    }

    /// When the live timer will fire, if one is pending.
    pub fn timer_deadline(&self) -> Option<Instant> {
        match &self.inner.state.lock().timer {
            DebounceTimer::Pending { deadline, .. } => Some(*deadline),
            DebounceTimer::Idle => None,
        }
    }

    /// The configured quiet period.
    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Roots with a live subscription.
    pub fn watched_roots(&self) -> Vec<PathBuf> {
        self.subscriptions
            .lock()
            .iter()
            .map(|s| s.root().to_path_buf())
            .collect()
    }
}

impl Drop for DebouncedWatcher {
    fn drop(&mut self) {
        self.unsubscribe();
        self.inner.state.lock().cancel_timer();
    }
}

impl std::fmt::Debug for DebouncedWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedWatcher")
            .field("debounce", &self.inner.debounce)
            .field("backend", &self.source.backend_type())
            .field("roots", &self.watched_roots())
            .finish()
    }
}
