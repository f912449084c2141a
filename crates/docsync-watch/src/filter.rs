//! Path filtering for raw change notifications.
//!
//! Every decision is made on the path relative to the analysis base, which is
//! the workspace root joined with the configured `analysis_root` (if any).
//! The report output directory, the snapshot file and the exclusion globs are
//! all interpreted relative to that same base.

use crate::error::Result;
use crate::listing::relative_str;
use docsync_config::WatchPathsConfig;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Compiled glob-style exclusion patterns.
///
/// A relative path is excluded when it, or any of its ancestor directories,
/// matches one of the patterns. `node_modules` therefore excludes
/// `node_modules/pkg/index.js` just like `node_modules/**` does.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExcludeSet {
    /// Compile patterns. Blank patterns are ignored.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();

        for pattern in patterns {
            let trimmed = pattern.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            let normalized = trimmed.trim_start_matches("./").trim_end_matches('/');
            builder.add(Glob::new(normalized)?);
            kept.push(normalized.to_string());
        }

        Ok(Self {
            patterns: kept,
            set: builder.build()?,
        })
    }

    /// An empty set that matches nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Whether the relative path is excluded.
    pub fn is_match(&self, rel: &str) -> bool {
        self.matching_pattern(rel).is_some()
    }

    /// The first pattern that excludes `rel`, if any.
    pub fn matching_pattern(&self, rel: &str) -> Option<&str> {
        if self.patterns.is_empty() {
            return None;
        }
        for candidate in ancestors_and_self(rel) {
            if let Some(&index) = self.set.matches(candidate).first() {
                return Some(&self.patterns[index]);
            }
        }
        None
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no patterns were compiled.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// `a`, `a/b`, `a/b/c` for `a/b/c`.
fn ancestors_and_self(rel: &str) -> impl Iterator<Item = &str> {
    rel.match_indices('/')
        .map(move |(i, _)| &rel[..i])
        .chain(std::iter::once(rel))
}

/// Outcome of filtering one changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Record the change; carries the path relative to the analysis base
    Accept(String),
    /// The path is not inside the analysis base
    OutsideRoot,
    /// The path belongs to the generated report output
    ReportOutput,
    /// The path is the snapshot/state file
    SnapshotFile,
    /// The path matched an exclusion pattern
    Excluded(String),
}

impl FilterDecision {
    /// Whether the change should be recorded.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept(_))
    }
}

/// Decides which changed paths are relevant to a monitored root.
#[derive(Debug, Clone)]
pub struct PathFilter {
    base: PathBuf,
    report_dir: String,
    snapshot_file: String,
    excludes: ExcludeSet,
}

impl PathFilter {
    /// Build a filter for `workspace_root` from configuration.
    pub fn new(workspace_root: &Path, config: &WatchPathsConfig) -> Result<Self> {
        let base = match config.analysis_root.as_deref().map(normalize_rel) {
            Some(sub) if !sub.is_empty() => workspace_root.join(sub),
            _ => workspace_root.to_path_buf(),
        };

        Ok(Self {
            base,
            report_dir: normalize_rel(&config.report_dir),
            snapshot_file: normalize_rel(&config.snapshot_file),
            excludes: ExcludeSet::new(config.exclude_patterns.as_slice())?,
        })
    }

    /// The directory all relative decisions are made against.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Classify a changed path. Relative inputs are taken as relative to the base.
    pub fn classify(&self, path: &Path) -> FilterDecision {
        let absolute;
        let path = if path.is_relative() {
            absolute = self.base.join(path);
            absolute.as_path()
        } else {
            path
        };

        let rel = match relative_str(&self.base, path) {
            Some(rel) => rel,
            None => return FilterDecision::OutsideRoot,
        };

        if !self.report_dir.is_empty() && is_within(&rel, &self.report_dir) {
            return FilterDecision::ReportOutput;
        }
        if !self.snapshot_file.is_empty() && rel == self.snapshot_file {
            return FilterDecision::SnapshotFile;
        }
        if let Some(pattern) = self.excludes.matching_pattern(&rel) {
            return FilterDecision::Excluded(pattern.to_string());
        }

        FilterDecision::Accept(rel)
    }

    /// Whether a change to `path` should be recorded.
    pub fn should_record(&self, path: &Path) -> bool {
        self.classify(path).is_accepted()
    }
}

fn normalize_rel(value: &str) -> String {
    value
        .trim()
        .replace('\\', "/")
        .trim_start_matches("./")
        .trim_end_matches('/')
        .to_string()
}

fn is_within(rel: &str, dir: &str) -> bool {
    rel == dir
        || rel
            .strip_prefix(dir)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}
