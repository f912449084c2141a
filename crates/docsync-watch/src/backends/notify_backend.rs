//! Notify-based change source.

use crate::{
    error::{Error, Result},
    traits::{ChangeCallback, ChangeSource, Subscription},
};

use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::Path;
use tracing::{debug, error, info};

/// Change source backed by the platform's native file notifications.
///
/// Every subscription owns its own recursive watcher, so disposing one root
/// never affects another.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifySource;

impl NotifySource {
    /// Create a new notify-based source.
    pub fn new() -> Self {
        Self
    }

    /// Paths of an event worth reporting. Pure access events are not changes.
    fn changed_paths(event: Event) -> Vec<std::path::PathBuf> {
        match event.kind {
            EventKind::Access(_) => Vec::new(),
            _ => event.paths,
        }
    }
}

impl ChangeSource for NotifySource {
    fn backend_type(&self) -> &'static str {
        "notify"
    }

    fn subscribe(&self, root: &Path, on_change: ChangeCallback) -> Result<Subscription> {
        debug!("Adding watch for: {}", root.display());

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for path in Self::changed_paths(event) {
                        on_change(path);
                    }
                }
                Err(e) => {
                    error!("Notify error: {:?}", e);
                }
            }
        })
        .map_err(|e| Error::Watch(format!("Failed to create notify watcher: {}", e)))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| Error::Watch(format!("Failed to watch path: {}", e)))?;

        info!("Added notify watch: {}", root.display());
        Ok(Subscription::with_guard(root.to_path_buf(), watcher))
    }
}
