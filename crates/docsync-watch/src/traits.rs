//! Capability traits at the boundary with the host.

use crate::error::Result;
use crate::types::PendingChangeState;
use async_trait::async_trait;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callback receiving absolute paths of raw change notifications.
pub type ChangeCallback = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// Callback receiving the accumulated pending state after each debounce.
pub type PendingCallback = Arc<dyn Fn(PendingChangeState) + Send + Sync>;

/// Host primitive that reports raw file changes under a root.
pub trait ChangeSource: Send + Sync {
    /// Get the backend type identifier.
    fn backend_type(&self) -> &'static str;

    /// Start delivering changes under `root` to `on_change`.
    ///
    /// Delivery stops when the returned [`Subscription`] is dropped or disposed.
    fn subscribe(&self, root: &Path, on_change: ChangeCallback) -> Result<Subscription>;
}

/// Handle to an active subscription. Dropping it unsubscribes.
pub struct Subscription {
    root: PathBuf,
    guard: Option<Box<dyn Any + Send>>,
    on_dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Keep `guard` alive for as long as the subscription lives.
    pub fn with_guard(root: PathBuf, guard: impl Any + Send) -> Self {
        Self {
            root,
            guard: Some(Box::new(guard)),
            on_dispose: None,
        }
    }

    /// Run `dispose` when the subscription ends.
    pub fn with_dispose(root: PathBuf, dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            root,
            guard: None,
            on_dispose: Some(Box::new(dispose)),
        }
    }

    /// The root this subscription watches.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// End the subscription now.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.guard.take();
        if let Some(dispose) = self.on_dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("root", &self.root)
            .field("active", &(self.guard.is_some() || self.on_dispose.is_some()))
            .finish()
    }
}

/// Flags passed through to the update routine unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Do not show user notifications for this run
    pub suppress_notifications: bool,
    /// Do not open the regenerated documents afterwards
    pub suppress_auto_open: bool,
}

impl UpdateOptions {
    /// Options used for runs triggered by the watcher.
    pub fn from_watcher() -> Self {
        Self {
            suppress_notifications: true,
            suppress_auto_open: true,
        }
    }
}

/// The expensive regenerate-derived-artifacts operation.
///
/// Its internals are opaque to the scheduler, which only guarantees that two
/// invocations for the same scheduler never overlap.
#[async_trait]
pub trait UpdateRoutine: Send + Sync {
    /// Regenerate artifacts for `root`.
    async fn run_update(&self, root: &Path, options: UpdateOptions) -> anyhow::Result<()>;
}
