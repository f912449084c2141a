//! Structured delta between two snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::snapshot::Snapshot;

/// What changed between two snapshots.
///
/// For the first run (`is_initial`), only `total_changes` is populated; the
/// file sets stay empty so that first-run rendering can tell the two cases
/// apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDiff {
    /// No previous snapshot existed
    pub is_initial: bool,
    /// Files present now but not before
    pub new_files: BTreeSet<String>,
    /// Files present before but not now
    pub removed_files: BTreeSet<String>,
    /// Recognized config files whose contents differ
    pub changed_configs: BTreeSet<String>,
    /// Signed per-extension count deltas, zero deltas omitted
    pub language_stats_diff: BTreeMap<String, i64>,
    /// New + removed + changed configs, or the file count on the first run
    pub total_changes: usize,
    /// When the previous snapshot was taken
    pub previous_snapshot_time: Option<DateTime<Utc>>,
    /// When the current snapshot was taken
    pub current_snapshot_time: DateTime<Utc>,
}

impl SnapshotDiff {
    /// Whether nothing changed. Never true for an initial diff of a non-empty tree.
    pub fn is_empty(&self) -> bool {
        self.total_changes == 0 && self.language_stats_diff.is_empty()
    }

    /// Short human-readable description.
    pub fn summary(&self) -> String {
        if self.is_initial {
            return format!("initial snapshot: {} files", self.total_changes);
        }
        format!(
            "{} new, {} removed, {} config changes",
            self.new_files.len(),
            self.removed_files.len(),
            self.changed_configs.len()
        )
    }
}

/// Compare two snapshots. Pure: performs no I/O.
pub fn compare(previous: Option<&Snapshot>, current: &Snapshot) -> SnapshotDiff {
    let Some(previous) = previous else {
        return SnapshotDiff {
            is_initial: true,
            new_files: BTreeSet::new(),
            removed_files: BTreeSet::new(),
            changed_configs: BTreeSet::new(),
            language_stats_diff: BTreeMap::new(),
            total_changes: current.files_count,
            previous_snapshot_time: None,
            current_snapshot_time: current.created_at,
        };
    };

    let before: HashSet<&str> = previous.file_list.iter().map(String::as_str).collect();
    let after: HashSet<&str> = current.file_list.iter().map(String::as_str).collect();

    let new_files: BTreeSet<String> = after
        .difference(&before)
        .map(|s| s.to_string())
        .collect();
    let removed_files: BTreeSet<String> = before
        .difference(&after)
        .map(|s| s.to_string())
        .collect();

    let changed_configs: BTreeSet<String> = previous
        .config_files
        .keys()
        .chain(current.config_files.keys())
        .filter(|id| {
            config_changed(
                previous.config_files.get(id.as_str()),
                current.config_files.get(id.as_str()),
            )
        })
        .cloned()
        .collect();

    let language_stats_diff = language_delta(&previous.language_stats, &current.language_stats);
    let total_changes = new_files.len() + removed_files.len() + changed_configs.len();

    SnapshotDiff {
        is_initial: false,
        new_files,
        removed_files,
        changed_configs,
        language_stats_diff,
        total_changes,
        previous_snapshot_time: Some(previous.created_at),
        current_snapshot_time: current.created_at,
    }
}

/// Top-level fields whose values differ between two config documents.
///
/// A config present on only one side reports all of its fields (or `"*"` for
/// non-object documents).
pub fn changed_config_fields(
    previous: Option<&serde_json::Value>,
    current: Option<&serde_json::Value>,
) -> Vec<String> {
    use serde_json::Value;

    match (previous, current) {
        (None, None) => Vec::new(),
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            keys.into_iter()
                .filter(|k| a.get(k.as_str()) != b.get(k.as_str()))
                .cloned()
                .collect()
        }
        (Some(a), Some(b)) => {
            if a == b {
                Vec::new()
            } else {
                vec!["*".to_string()]
            }
        }
        (Some(only), None) | (None, Some(only)) => match only {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => vec!["*".to_string()],
        },
    }
}

fn config_changed(previous: Option<&serde_json::Value>, current: Option<&serde_json::Value>) -> bool {
    match (previous, current) {
        (Some(_), None) | (None, Some(_)) => true,
        _ => !changed_config_fields(previous, current).is_empty(),
    }
}

fn language_delta(
    previous: &BTreeMap<String, i64>,
    current: &BTreeMap<String, i64>,
) -> BTreeMap<String, i64> {
    previous
        .keys()
        .chain(current.keys())
        .filter_map(|ext| {
            let delta = current.get(ext).copied().unwrap_or(0) - previous.get(ext).copied().unwrap_or(0);
            (delta != 0).then(|| (ext.clone(), delta))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(files: &[&str]) -> Snapshot {
        Snapshot::from_file_list(files.iter().map(|s| s.to_string()).collect(), Utc::now())
    }

    #[test]
    fn test_initial_diff_only_carries_a_count() {
        let files: Vec<String> = (0..10).map(|i| format!("f{}.md", i)).collect();
        let current = Snapshot::from_file_list(files, Utc::now());

        let diff = compare(None, &current);
        assert!(diff.is_initial);
        assert_eq!(diff.total_changes, 10);
        assert!(diff.new_files.is_empty());
        assert!(diff.removed_files.is_empty());
        assert!(diff.changed_configs.is_empty());
        assert!(diff.previous_snapshot_time.is_none());
        assert_eq!(diff.summary(), "initial snapshot: 10 files");
    }

    #[test]
    fn test_new_and_removed_files() {
        let a = snapshot(&["a", "b"]);
        let b = snapshot(&["b", "c"]);

        let diff = compare(Some(&a), &b);
        assert!(!diff.is_initial);
        assert_eq!(diff.new_files, BTreeSet::from(["c".to_string()]));
        assert_eq!(diff.removed_files, BTreeSet::from(["a".to_string()]));
        assert!(diff.total_changes >= 2);
        assert_eq!(diff.previous_snapshot_time, Some(a.created_at));
    }

    #[test]
    fn test_language_delta_omits_zero() {
        let a = snapshot(&["x.rs", "y.rs", "z.md"]);
        let b = snapshot(&["x.rs", "z.md", "w.ts", "v.ts"]);

        let diff = compare(Some(&a), &b);
        assert_eq!(diff.language_stats_diff.get("rs"), Some(&-1));
        assert_eq!(diff.language_stats_diff.get("ts"), Some(&2));
        assert!(!diff.language_stats_diff.contains_key("md"));
    }

    #[test]
    fn test_changed_configs() {
        let a = snapshot(&["package.json"])
            .with_config("package.json", json!({"name": "app", "version": "1.0.0"}))
            .with_config("Cargo.toml", json!({"edition": "2021"}));
        let b = snapshot(&["package.json"])
            .with_config("package.json", json!({"version": "1.1.0", "name": "app"}))
            .with_config("Cargo.toml", json!({"edition": "2021"}))
            .with_config("go.mod", json!({"module": "x"}));

        let diff = compare(Some(&a), &b);
        assert_eq!(
            diff.changed_configs,
            BTreeSet::from(["package.json".to_string(), "go.mod".to_string()])
        );
        assert_eq!(diff.total_changes, 2);
        assert_eq!(
            changed_config_fields(a.config_files.get("package.json"), b.config_files.get("package.json")),
            vec!["version".to_string()]
        );
    }

    #[test]
    fn test_identical_snapshots_are_empty() {
        let a = snapshot(&["a.md", "b.md"]);
        let b = snapshot(&["b.md", "a.md"]);
        let diff = compare(Some(&a), &b);
        assert!(diff.is_empty());
        assert_eq!(diff.summary(), "0 new, 0 removed, 0 config changes");
    }
}
