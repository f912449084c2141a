//! Point-in-time description of a directory tree.
//!
//! Snapshots are produced by the enclosing tool's scanner and persisted by it;
//! this crate only builds them from a file list and compares two of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Finding;

/// Config files whose structured contents are tracked between snapshots.
pub const RECOGNIZED_CONFIG_FILES: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "pyproject.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "composer.json",
    "Gemfile",
    "tsconfig.json",
    "docker-compose.yml",
];

const IMPORTANT_PREFIXES: &[&str] = &["readme", "license", "changelog", "contributing"];

/// A full, point-in-time description of a directory tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
    /// Number of files
    pub files_count: usize,
    /// Number of distinct directories containing files
    pub dirs_count: usize,
    /// Workspace-relative file paths
    pub file_list: Vec<String>,
    /// File count per lowercase extension
    pub language_stats: BTreeMap<String, i64>,
    /// Structured contents of recognized config files, keyed by identifier
    pub config_files: BTreeMap<String, serde_json::Value>,
    /// Files worth calling out in reports
    pub important_files: Vec<String>,
    /// Tag findings, when a scan was included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<Vec<Finding>>,
}

impl Snapshot {
    /// Derive counts, histogram and important files from a file list.
    pub fn from_file_list(files: Vec<String>, created_at: DateTime<Utc>) -> Self {
        let mut language_stats = BTreeMap::new();
        let mut dirs = std::collections::BTreeSet::new();
        let mut important_files = Vec::new();

        for file in &files {
            let (dir, name) = match file.rsplit_once('/') {
                Some((dir, name)) => (dir, name),
                None => ("", file.as_str()),
            };
            dirs.insert(dir);

            if let Some(ext) = extension_of(name) {
                *language_stats.entry(ext).or_insert(0) += 1;
            }

            let lower = name.to_ascii_lowercase();
            if IMPORTANT_PREFIXES.iter().any(|p| lower.starts_with(p))
                || RECOGNIZED_CONFIG_FILES.contains(&name)
            {
                important_files.push(file.clone());
            }
        }

        Self {
            created_at,
            files_count: files.len(),
            dirs_count: dirs.len(),
            file_list: files,
            language_stats,
            config_files: BTreeMap::new(),
            important_files,
            findings: None,
        }
    }

    /// Attach the parsed contents of a recognized config file.
    pub fn with_config(mut self, id: impl Into<String>, contents: serde_json::Value) -> Self {
        self.config_files.insert(id.into(), contents);
        self
    }

    /// Attach scan findings.
    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = Some(findings);
        self
    }

    /// Deserialize from the persisted JSON form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn extension_of(name: &str) -> Option<String> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_file_list() {
        let snapshot = Snapshot::from_file_list(
            files(&[
                "README.md",
                "Cargo.toml",
                "src/lib.rs",
                "src/main.rs",
                "src/util/mod.RS",
                ".gitignore",
                "Makefile",
            ]),
            Utc::now(),
        );

        assert_eq!(snapshot.files_count, 7);
        assert_eq!(snapshot.dirs_count, 3);
        assert_eq!(snapshot.language_stats.get("rs"), Some(&3));
        assert_eq!(snapshot.language_stats.get("md"), Some(&1));
        assert!(!snapshot.language_stats.contains_key("gitignore"));
        assert_eq!(
            snapshot.important_files,
            files(&["README.md", "Cargo.toml"])
        );
    }

    #[test]
    fn test_json_round_trip_uses_camel_case() {
        let snapshot = Snapshot::from_file_list(files(&["a.md"]), Utc::now())
            .with_config("package.json", serde_json::json!({"name": "x"}));
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"filesCount\""));
        assert!(!json.contains("findings"));
        assert_eq!(Snapshot::from_json(&json).unwrap(), snapshot);
    }
}
