//! In-memory change source driven by explicit calls.

use crate::{
    error::Result,
    traits::{ChangeCallback, ChangeSource, Subscription},
};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    by_id: HashMap<u64, (PathBuf, ChangeCallback)>,
}

/// Change source whose notifications are injected with [`SyntheticSource::emit`].
///
/// Used by tests and by hosts that already own a file-system watcher.
#[derive(Clone, Default)]
pub struct SyntheticSource {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl SyntheticSource {
    /// Create a source with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `path` to every subscriber whose root contains it.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        // Callbacks may re-enter the source, so run them outside the lock.
        let targets: Vec<ChangeCallback> = self
            .subscribers
            .lock()
            .by_id
            .values()
            .filter(|(root, _)| path.starts_with(root))
            .map(|(_, callback)| callback.clone())
            .collect();

        trace!("Emitting {} to {} subscribers", path.display(), targets.len());
        for callback in &targets {
            callback(path.to_path_buf());
        }
        targets.len()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().by_id.len()
    }
}

impl ChangeSource for SyntheticSource {
    fn backend_type(&self) -> &'static str {
        "synthetic"
    }

    fn subscribe(&self, root: &Path, on_change: ChangeCallback) -> Result<Subscription> {
        let id = {
            let mut subs = self.subscribers.lock();
            let id = subs.next_id;
            subs.next_id += 1;
            subs.by_id.insert(id, (root.to_path_buf(), on_change));
            id
        };

        let subscribers = Arc::downgrade(&self.subscribers);
        Ok(Subscription::with_dispose(root.to_path_buf(), move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.lock().by_id.remove(&id);
            }
        }))
    }
}

impl std::fmt::Debug for SyntheticSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticSource")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, Arc::new(move |_: PathBuf| {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_emit_reaches_matching_roots_only() {
        let source = SyntheticSource::new();
        let (a_count, a_cb) = counter();
        let (b_count, b_cb) = counter();
        let _a = source.subscribe(Path::new("/ws/a"), a_cb).unwrap();
        let _b = source.subscribe(Path::new("/ws/b"), b_cb).unwrap();

        assert_eq!(source.emit("/ws/a/file.md"), 1);
        assert_eq!(source.emit("/elsewhere/file.md"), 0);
        assert_eq!(a_count.load(Ordering::SeqCst), 1);
        assert_eq!(b_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let source = SyntheticSource::new();
        let (count, cb) = counter();
        let sub = source.subscribe(Path::new("/ws"), cb).unwrap();
        assert_eq!(source.subscriber_count(), 1);

        drop(sub);
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(source.emit("/ws/x"), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
