//! Incremental TODO/FIXME scanner
//!
//! The scanner looks at a bounded set of candidate text files and collects
//! lines tagged `TODO` or `FIXME`. Work is skipped at two levels:
//!
//! 1. An aggregate hash over every candidate's `(path, size, mtime)` is
//!    compared against the previous run. If nothing moved, the previous
//!    findings are returned without touching file contents.
//! 2. Otherwise only files whose [`FileSignature`] changed are read again;
//!    all other files reuse their cached findings.
//!
//! State lives in the shared TTL cache under one key per scan configuration,
//! so it disappears on its own once a root stops being scanned.
//!
//! Stat and read failures never fail a scan. A file that cannot be stat'ed
//! gets the absent signature, and a file that cannot be read yields no
//! findings.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use docsync_config::ScannerLimits;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, trace};

use crate::cache::{CacheValue, SharedCache};
use crate::cache_key::CacheKey;
use crate::types::{FileSignature, Finding, FindingTag};

/// Maximum length of a finding's text, ellipsis included.
pub const MAX_FINDING_TEXT: usize = 200;

const ELLIPSIS: &str = "...";

const INSPECTABLE_EXTENSIONS: &[&str] = &[
    "md", "markdown", "mdx", "txt", "rst", "adoc", "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs",
    "py", "go", "java", "kt", "kts", "swift", "c", "h", "cc", "cpp", "hpp", "cs", "rb", "php",
    "sh", "bash", "zsh", "ps1", "yaml", "yml", "toml", "json", "ini", "cfg", "html", "css",
    "scss", "less", "vue", "svelte", "sql", "lua", "dart", "scala", "ex", "exs", "erl", "hs",
    "ml", "clj", "r", "jl", "zig", "nim", "tf", "proto", "graphql", "gradle",
];

const INSPECTABLE_BASENAMES: &[&str] = &[
    "Dockerfile",
    "Makefile",
    "Justfile",
    "justfile",
    "Rakefile",
    "Gemfile",
    "Procfile",
    "Vagrantfile",
];

/// Cached findings of one file together with the signature they were read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFileFindings {
    /// Signature at the time the file was read
    pub signature: FileSignature,
    /// Findings produced from that content
    pub findings: Vec<Finding>,
}

/// Everything remembered between two scans of the same configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagScanState {
    /// Hash over all candidates' paths and signatures
    pub aggregate_hash: u64,
    /// Per-file state keyed by relative path
    pub files: HashMap<String, CachedFileFindings>,
    /// The aggregated result of the last scan
    pub findings: Vec<Finding>,
    /// Whether the last scan hit the findings cap
    pub truncated: bool,
}

/// Work counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Candidate files after filtering and capping
    pub candidates: usize,
    /// Files whose content was read
    pub files_read: usize,
    /// Files whose cached findings were reused
    pub files_reused: usize,
    /// Whether the aggregate hash matched and no file was inspected
    pub cache_hit: bool,
    /// Whether the findings cap stopped the scan early
    pub truncated: bool,
}

impl ScanStats {
    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} candidates, {} read, {} reused{}{}",
            self.candidates,
            self.files_read,
            self.files_reused,
            if self.cache_hit { ", cache hit" } else { "" },
            if self.truncated { ", truncated" } else { "" },
        )
    }
}

/// Result of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScanReport {
    /// Findings in candidate order, capped at the configured limit
    pub findings: Vec<Finding>,
    /// What the scan had to do
    pub stats: ScanStats,
}

/// Scanner for TODO/FIXME tags backed by the shared cache.
pub struct TagScanner {
    cache: SharedCache,
    limits: ScannerLimits,
}

impl TagScanner {
    /// Cache key type for scanner state.
    pub const KIND: &'static str = "tags";

    /// Create a scanner with the given limits.
    pub fn new(cache: SharedCache, limits: ScannerLimits) -> Self {
        Self { cache, limits }
    }

    /// Create a scanner with default limits.
    pub fn with_defaults(cache: SharedCache) -> Self {
        Self::new(cache, ScannerLimits::default())
    }

    /// The configured limits.
    pub fn limits(&self) -> &ScannerLimits {
        &self.limits
    }

    /// Cache key under which state for `root` and the current limits lives.
    pub fn cache_key(&self, root: &Path) -> String {
        CacheKey::new(Self::KIND, root)
            .part(self.limits.max_candidates)
            .part(self.limits.max_file_bytes)
            .part(self.limits.max_findings)
            .build()
    }

    /// Scan `files` (relative to `root`) for tags.
    pub async fn scan(&self, root: &Path, files: &[String]) -> TagScanReport {
        let candidates: Vec<&str> = files
            .iter()
            .map(String::as_str)
            .filter(|f| is_inspectable(f))
            .take(self.limits.max_candidates)
            .collect();

        let mut signed = Vec::with_capacity(candidates.len());
        for rel in &candidates {
            let signature = FileSignature::stat(&root.join(rel)).await;
            signed.push((*rel, signature));
        }

        let aggregate_hash = aggregate_signature_hash(&signed);
        let key = self.cache_key(root);
        let previous = match self.cache.get(&key) {
            Some(CacheValue::TagScan(state)) => Some(state),
            _ => None,
        };

        let mut stats = ScanStats {
            candidates: signed.len(),
            ..ScanStats::default()
        };

        if let Some(ref prev) = previous {
            if prev.aggregate_hash == aggregate_hash {
                trace!("Tag scan cache hit for {}", root.display());
                stats.cache_hit = true;
                stats.truncated = prev.truncated;
                return TagScanReport {
                    findings: prev.findings.clone(),
                    stats,
                };
            }
        }

        let mut next_files = HashMap::with_capacity(signed.len());
        let mut findings: Vec<Finding> = Vec::new();

        for (rel, signature) in signed {
            let remaining = self.limits.max_findings.saturating_sub(findings.len());
            if remaining == 0 {
                stats.truncated = true;
                break;
            }

            let reusable = previous
                .as_ref()
                .and_then(|prev| prev.files.get(rel))
                .filter(|cached| cached.signature == signature);

            if let Some(cached) = reusable {
                stats.files_reused += 1;
                if cached.findings.len() > remaining {
                    stats.truncated = true;
                }
                findings.extend(cached.findings.iter().take(remaining).cloned());
                next_files.insert(rel.to_string(), cached.clone());
                continue;
            }

            let (file_findings, complete) = if signature.is_absent()
                || signature.size_bytes as u64 > self.limits.max_file_bytes
            {
                (Vec::new(), true)
            } else {
                stats.files_read += 1;
                match tokio::fs::read(root.join(rel)).await {
                    Ok(bytes) => extract_findings(rel, &bytes, remaining),
                    Err(e) => {
                        debug!("Could not read {}: {}", rel, e);
                        (Vec::new(), true)
                    }
                }
            };

            if !complete {
                stats.truncated = true;
            }
            findings.extend(file_findings.iter().cloned());
            // A file cut short by the cap must be read again next time.
            if complete {
                next_files.insert(
                    rel.to_string(),
                    CachedFileFindings {
                        signature,
                        findings: file_findings,
                    },
                );
            }
        }

        info!(
            "Tag scan of {}: {} findings ({})",
            root.display(),
            findings.len(),
            stats.summary()
        );

        let state = TagScanState {
            aggregate_hash,
            files: next_files,
            findings: findings.clone(),
            truncated: stats.truncated,
        };
        self.cache.set(key, CacheValue::TagScan(Arc::new(state)));

        TagScanReport { findings, stats }
    }

    /// Forget cached state for `root` across all limit configurations.
    pub fn invalidate(&self, root: &Path) -> usize {
        self.cache
            .delete_by_prefix(&CacheKey::prefix(Self::KIND, root))
    }
}

/// Whether a relative path looks like a text file worth scanning.
pub fn is_inspectable(rel: &str) -> bool {
    let name = rel.rsplit('/').next().unwrap_or(rel);
    if INSPECTABLE_BASENAMES.contains(&name) {
        return true;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() || name.starts_with('.') => {
            let ext = ext.to_ascii_lowercase();
            INSPECTABLE_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

fn aggregate_signature_hash(signed: &[(&str, FileSignature)]) -> u64 {
    let mut hasher = DefaultHasher::new();
    signed.len().hash(&mut hasher);
    for (rel, signature) in signed {
        rel.hash(&mut hasher);
        signature.hash(&mut hasher);
    }
    hasher.finish()
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(TODO|FIXME)\b(.*)$").unwrap());

/// Extract up to `budget` findings. The flag is false when the budget cut
/// the file short.
fn extract_findings(rel: &str, bytes: &[u8], budget: usize) -> (Vec<Finding>, bool) {
    if bytes.contains(&0) {
        trace!("Skipping binary file {}", rel);
        return (Vec::new(), true);
    }

    let content = String::from_utf8_lossy(bytes);
    let mut findings = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let Some(caps) = TAG_RE.captures(line) else {
            continue;
        };
        if findings.len() >= budget {
            return (findings, false);
        }
        let Some(tag) = caps.get(1).and_then(|m| FindingTag::parse(m.as_str())) else {
            continue;
        };
        let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        findings.push(Finding {
            file: rel.to_string(),
            line: index + 1,
            tag,
            text: clean_text(rest),
        });
    }

    (findings, true)
}

/// Trim leading punctuation/whitespace, collapse whitespace, cap the length.
fn clean_text(raw: &str) -> String {
    let trimmed = raw.trim_start_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= MAX_FINDING_TEXT {
        return collapsed;
    }
    let keep = MAX_FINDING_TEXT - ELLIPSIS.len();
    let mut truncated: String = collapsed.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use std::fs;
    use tempfile::TempDir;

    fn scanner(limits: ScannerLimits) -> TagScanner {
        TagScanner::new(Arc::new(TtlCache::new(30_000)), limits)
    }

    #[test]
    fn test_inspectable_files() {
        assert!(is_inspectable("src/main.rs"));
        assert!(is_inspectable("README.MD"));
        assert!(is_inspectable("docker/Dockerfile"));
        assert!(is_inspectable(".eslintrc.json"));
        assert!(!is_inspectable("assets/logo.png"));
        assert!(!is_inspectable("LICENSE"));
        assert!(!is_inspectable("bin/tool"));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(":  fix   the\tparser "), "fix the parser");
        assert_eq!(clean_text("(alice): handle  EOF"), "alice): handle EOF");
        assert_eq!(clean_text(""), "");

        let long = "word ".repeat(100);
        let cleaned = clean_text(&long);
        assert_eq!(cleaned.chars().count(), MAX_FINDING_TEXT);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn test_extract_findings() {
        let content = b"fn a() {}\n// TODO: first\nlet x = 1; // FIXME - second\n// TODOS are not tags\n";
        let (findings, complete) = extract_findings("a.rs", content, 10);
        assert!(complete);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].line, 2);
        assert_eq!(findings[0].tag, FindingTag::Todo);
        assert_eq!(findings[0].text, "first");
        assert_eq!(findings[1].line, 3);
        assert_eq!(findings[1].tag, FindingTag::Fixme);
        assert_eq!(findings[1].text, "second");
    }

    #[test]
    fn test_binary_content_yields_nothing() {
        let (findings, complete) = extract_findings("a.bin", b"TODO: x\0y", 10);
        assert!(findings.is_empty());
        assert!(complete);
    }

    #[test]
    fn test_budget_marks_incomplete() {
        let (findings, complete) = extract_findings("a.md", b"TODO one\nTODO two\nTODO three\n", 2);
        assert_eq!(findings.len(), 2);
        assert!(!complete);
    }

    #[tokio::test]
    async fn test_unchanged_tree_is_a_cache_hit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "// TODO: a\n").unwrap();
        fs::write(dir.path().join("b.md"), "FIXME b\n").unwrap();
        let files = vec!["a.rs".to_string(), "b.md".to_string(), "c.png".to_string()];
        let scanner = scanner(ScannerLimits::default());

        let first = scanner.scan(dir.path(), &files).await;
        assert_eq!(first.stats.candidates, 2);
        assert_eq!(first.stats.files_read, 2);
        assert_eq!(first.findings.len(), 2);

        let second = scanner.scan(dir.path(), &files).await;
        assert!(second.stats.cache_hit);
        assert_eq!(second.stats.files_read, 0);
        assert_eq!(second.findings, first.findings);
    }

    #[tokio::test]
    async fn test_missing_and_oversized_files_are_not_read() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.txt"), "TODO: too big\n".repeat(10)).unwrap();
        let files = vec!["missing.rs".to_string(), "big.txt".to_string()];
        let scanner = scanner(ScannerLimits {
            max_file_bytes: 20,
            ..ScannerLimits::default()
        });

        let report = scanner.scan(dir.path(), &files).await;
        assert_eq!(report.stats.candidates, 2);
        assert_eq!(report.stats.files_read, 0);
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn test_candidate_and_findings_caps() {
        let dir = TempDir::new().unwrap();
        for name in ["a.md", "b.md", "c.md"] {
            fs::write(dir.path().join(name), "TODO 1\nTODO 2\n").unwrap();
        }
        let files: Vec<String> = ["a.md", "b.md", "c.md"].iter().map(|s| s.to_string()).collect();

        let report = scanner(ScannerLimits {
            max_candidates: 2,
            ..ScannerLimits::default()
        })
        .scan(dir.path(), &files)
        .await;
        assert_eq!(report.stats.candidates, 2);
        assert_eq!(report.findings.len(), 4);

        let report = scanner(ScannerLimits {
            max_findings: 3,
            ..ScannerLimits::default()
        })
        .scan(dir.path(), &files)
        .await;
        assert_eq!(report.findings.len(), 3);
        assert!(report.stats.truncated);
        // The third file is never opened once the cap is hit.
        assert_eq!(report.stats.files_read, 2);
    }

    #[tokio::test]
    async fn test_limits_scope_the_cache_key() {
        let cache: SharedCache = Arc::new(TtlCache::new(30_000));
        let a = TagScanner::with_defaults(cache.clone());
        let b = TagScanner::new(
            cache.clone(),
            ScannerLimits {
                max_findings: 5,
                ..ScannerLimits::default()
            },
        );
        let root = Path::new("/ws");
        assert_ne!(a.cache_key(root), b.cache_key(root));
        assert!(a.cache_key(root).starts_with("tags:/ws:"));
    }
}
