//! Shared value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Cheap proxy for file content equality: size plus modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSignature {
    /// File size in bytes, `-1` when unknown
    pub size_bytes: i64,
    /// Modification time in milliseconds since the epoch, `-1` when unknown
    pub modified_at_ms: i64,
}

impl FileSignature {
    /// Sentinel for files that could not be stat'ed.
    pub const ABSENT: FileSignature = FileSignature {
        size_bytes: -1,
        modified_at_ms: -1,
    };

    /// Build a signature from filesystem metadata.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified_at_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(-1);

        Self {
            size_bytes: metadata.len() as i64,
            modified_at_ms,
        }
    }

    /// Stat `path`, returning [`FileSignature::ABSENT`] on failure.
    pub async fn stat(path: &Path) -> Self {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Self::from_metadata(&metadata),
            Err(_) => Self::ABSENT,
        }
    }

    /// Whether this is the "could not stat" sentinel.
    pub fn is_absent(&self) -> bool {
        *self == Self::ABSENT
    }
}

/// Marker tags the scanner looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingTag {
    /// `TODO`
    Todo,
    /// `FIXME`
    Fixme,
}

impl FindingTag {
    /// Parse the literal tag text.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "TODO" => Some(Self::Todo),
            "FIXME" => Some(Self::Fixme),
            _ => None,
        }
    }

    /// The literal tag text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Fixme => "FIXME",
        }
    }
}

impl fmt::Display for FindingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tagged line found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    /// Workspace-relative file path
    pub file: String,
    /// 1-based line number
    pub line: usize,
    /// Which tag matched
    pub tag: FindingTag,
    /// Text following the tag, whitespace-collapsed and length-capped
    pub text: String,
}

/// Changes accumulated by a debounced watcher since the last clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChangeState {
    /// Whether anything was recorded
    pub has_pending_changes: bool,
    /// Recorded paths in first-seen order
    pub changed_paths: Vec<String>,
}

impl PendingChangeState {
    /// Number of recorded paths.
    pub fn len(&self) -> usize {
        self.changed_paths.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        !self.has_pending_changes
    }

    pub(crate) fn record(&mut self, path: String) -> bool {
        self.has_pending_changes = true;
        if self.changed_paths.contains(&path) {
            return false;
        }
        self.changed_paths.push(path);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.has_pending_changes = false;
        self.changed_paths.clear();
    }
}
