//! # Docsync Change Detection
//!
//! Incremental change detection and update scheduling for a documentation
//! generator that regenerates derived artifacts from a large file tree.
//!
//! ## Features
//!
//! - **TTL cache** with an injectable clock, shared by every component that memoizes work
//! - **Content-signature tag scanner** that only re-reads files whose size or mtime changed
//! - **Snapshot diff engine** producing new/removed files, config and language deltas
//! - **Debounced watcher** that filters the tool's own output and configured exclusions
//! - **Single-flight scheduler** that never overlaps update runs and coalesces reruns
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │  ChangeSource   │───▶│ DebouncedWatcher │───▶│  UpdateScheduler │
//! │ (notify, test)  │    │ (filter, timer)  │    │   (single-flight)│
//! └─────────────────┘    └──────────────────┘    └──────────────────┘
//!                                                          │
//!                                                          ▼
//! ┌─────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │    TtlCache     │◀───│ TagScanner, diff │◀───│  UpdateRoutine   │
//! │                 │    │  CachedLister    │    │   (host code)    │
//! └─────────────────┘    └──────────────────┘    └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use docsync_config::{WatchPathsConfig, WatcherSettings};
//! use docsync_watch::{NotifySource, UpdateOptions, UpdateRoutine, UpdateScheduler};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! struct Regenerate;
//!
//! #[async_trait]
//! impl UpdateRoutine for Regenerate {
//!     async fn run_update(&self, root: &Path, _options: UpdateOptions) -> anyhow::Result<()> {
//!         println!("regenerating {}", root.display());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> docsync_watch::Result<()> {
//!     let scheduler = UpdateScheduler::new(
//!         "/path/to/workspace",
//!         WatchPathsConfig::default(),
//!         Arc::new(NotifySource::new()),
//!         Arc::new(Regenerate),
//!     )?;
//!     scheduler.apply_settings(WatcherSettings::enabled(1500))?;
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
pub mod cache;
mod cache_key;
pub mod clock;
pub mod diff;
pub mod error;
mod filter;
mod listing;
mod scanner;
mod scheduler;
pub mod snapshot;
pub mod traits;
pub mod types;
mod watcher;

pub use backends::*;
pub use cache::{CacheStats, CacheValue, SharedCache, TtlCache, DEFAULT_TTL_MS};
pub use cache_key::{normalize_discriminators, CacheKey};
pub use clock::{Clock, ManualClock, SystemClock};
pub use diff::{changed_config_fields, compare, SnapshotDiff};
pub use error::*;
pub use filter::{ExcludeSet, FilterDecision, PathFilter};
pub use listing::{CachedLister, FileLister, WalkLister};
pub use scanner::{
    is_inspectable, CachedFileFindings, ScanStats, TagScanReport, TagScanState, TagScanner,
    MAX_FINDING_TEXT,
};
pub use scheduler::{
    decide, update_all, RunGate, SchedulerStats, UpdateOutcome, UpdateScheduler, WatcherAction,
};
pub use snapshot::{Snapshot, RECOGNIZED_CONFIG_FILES};
pub use traits::*;
pub use types::*;
pub use watcher::DebouncedWatcher;

/// Re-exports of the configuration crate.
pub use docsync_config as config;
