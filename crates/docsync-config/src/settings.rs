//! Configuration schema for watching and scanning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1500;

/// Default directory (workspace-relative) the report writer emits into.
pub const DEFAULT_REPORT_DIR: &str = "docs/generated";

/// Default location (workspace-relative) of the persisted snapshot file.
pub const DEFAULT_SNAPSHOT_FILE: &str = ".docsync/snapshot.json";

/// User-facing watcher settings.
///
/// Compared structurally between two applications to decide whether the
/// watcher has to start, stop or restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// Whether change watching is enabled
    pub enabled: bool,
    /// Quiet period before pending changes are reported
    #[serde(alias = "debounceMs")]
    pub debounce_ms: u64,
}

impl WatcherSettings {
    /// Create enabled settings with the given debounce window.
    pub fn enabled(debounce_ms: u64) -> Self {
        Self {
            enabled: true,
            debounce_ms,
        }
    }

    /// Create disabled settings with the given debounce window.
    pub fn disabled(debounce_ms: u64) -> Self {
        Self {
            enabled: false,
            debounce_ms,
        }
    }

    /// The debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self::disabled(DEFAULT_DEBOUNCE_MS)
    }
}

/// Workspace-relative paths the watcher treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchPathsConfig {
    /// Subdirectory the analysis is scoped to; `None` means the workspace root
    #[serde(alias = "analysisRoot")]
    pub analysis_root: Option<String>,
    /// Directory the generated reports are written into
    #[serde(alias = "reportDir")]
    pub report_dir: String,
    /// File holding the persisted snapshot/session state
    #[serde(alias = "snapshotFile")]
    pub snapshot_file: String,
    /// Glob-style exclusion patterns, in configuration order
    #[serde(alias = "excludePatterns")]
    pub exclude_patterns: Vec<String>,
}

impl WatchPathsConfig {
    /// Scope analysis to a workspace subdirectory.
    pub fn with_analysis_root(mut self, root: impl Into<String>) -> Self {
        self.analysis_root = Some(root.into());
        self
    }

    /// Set the report output directory.
    pub fn with_report_dir(mut self, dir: impl Into<String>) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Set the snapshot file path.
    pub fn with_snapshot_file(mut self, file: impl Into<String>) -> Self {
        self.snapshot_file = file.into();
        self
    }

    /// Append an exclusion pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }
}

impl Default for WatchPathsConfig {
    fn default() -> Self {
        Self {
            analysis_root: None,
            report_dir: DEFAULT_REPORT_DIR.to_string(),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Bounds applied by the TODO/FIXME tag scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerLimits {
    /// Maximum number of candidate files inspected per scan
    #[serde(alias = "maxCandidates")]
    pub max_candidates: usize,
    /// Files larger than this are never read
    #[serde(alias = "maxFileBytes")]
    pub max_file_bytes: u64,
    /// The scan stops once this many findings were collected
    #[serde(alias = "maxFindings")]
    pub max_findings: usize,
}

impl Default for ScannerLimits {
    fn default() -> Self {
        Self {
            max_candidates: 300,
            max_file_bytes: 200_000,
            max_findings: 200,
        }
    }
}

/// Complete docsync configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsyncConfig {
    /// Watcher settings
    pub watcher: WatcherSettings,
    /// Special paths and exclusions
    pub paths: WatchPathsConfig,
    /// Tag scanner limits
    pub scanner: ScannerLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_disabled() {
        let settings = WatcherSettings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(settings.debounce(), Duration::from_millis(1500));
    }

    #[test]
    fn test_settings_compare_structurally() {
        assert_eq!(WatcherSettings::enabled(1500), WatcherSettings::enabled(1500));
        assert_ne!(WatcherSettings::enabled(1500), WatcherSettings::enabled(3000));
        assert_ne!(WatcherSettings::enabled(1500), WatcherSettings::disabled(1500));
    }

    #[test]
    fn test_camel_case_aliases() {
        let json = r#"{"enabled": true, "debounceMs": 250}"#;
        let settings: WatcherSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings, WatcherSettings::enabled(250));

        let json = r#"{"reportDir": "out", "excludePatterns": ["dist/**"]}"#;
        let paths: WatchPathsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(paths.report_dir, "out");
        assert_eq!(paths.snapshot_file, DEFAULT_SNAPSHOT_FILE);
        assert_eq!(paths.exclude_patterns, vec!["dist/**".to_string()]);
    }

    #[test]
    fn test_paths_builder() {
        let paths = WatchPathsConfig::default()
            .with_analysis_root("packages/app")
            .with_report_dir("reports")
            .exclude("**/*.log");

        assert_eq!(paths.analysis_root.as_deref(), Some("packages/app"));
        assert_eq!(paths.report_dir, "reports");
        assert_eq!(paths.exclude_patterns.len(), 1);
    }
}
