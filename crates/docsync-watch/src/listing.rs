//! Directory listings, memoized through the shared TTL cache.

use crate::cache::{CacheValue, SharedCache};
use crate::cache_key::{normalize_discriminators, CacheKey};
use crate::error::Result;
use crate::filter::ExcludeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Produces the workspace-relative file list of a root.
pub trait FileLister: Send + Sync {
    /// List files under `root`, skipping anything matched by `exclude_patterns`.
    ///
    /// Paths are relative to `root`, use `/` separators and are sorted.
    fn list(&self, root: &Path, exclude_patterns: &[String]) -> Result<Vec<String>>;
}

/// Recursive directory walk built on `walkdir`.
#[derive(Debug, Clone)]
pub struct WalkLister {
    follow_links: bool,
    skip_hidden_dirs: bool,
}

impl WalkLister {
    /// Create a lister that does not follow symlinks and skips hidden directories.
    pub fn new() -> Self {
        Self {
            follow_links: false,
            skip_hidden_dirs: true,
        }
    }

    /// Follow symbolic links while walking.
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Descend into directories whose name starts with a dot.
    pub fn with_hidden_dirs(mut self, include: bool) -> Self {
        self.skip_hidden_dirs = !include;
        self
    }
}

impl Default for WalkLister {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLister for WalkLister {
    fn list(&self, root: &Path, exclude_patterns: &[String]) -> Result<Vec<String>> {
        let excludes = ExcludeSet::new(exclude_patterns)?;
        let skip_hidden = self.skip_hidden_dirs;
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if skip_hidden && entry.file_type().is_dir() && is_hidden(entry.file_name()) {
                    return false;
                }
                match relative_str(root, entry.path()) {
                    Some(rel) => !excludes.is_match(&rel),
                    None => true,
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative_str(root, entry.path()) {
                files.push(rel);
            }
        }

        files.sort();
        debug!("Listed {} files under {}", files.len(), root.display());
        Ok(files)
    }
}

/// A [`FileLister`] whose results are memoized in the shared cache.
///
/// Exclusion lists that normalize to the same sequence share one entry, so a
/// repeated listing within the TTL window never reaches the inner lister.
pub struct CachedLister {
    cache: SharedCache,
    inner: Arc<dyn FileLister>,
}

impl CachedLister {
    /// Cache key type for listings.
    pub const KIND: &'static str = "listing";

    /// Wrap a lister.
    pub fn new(cache: SharedCache, inner: Arc<dyn FileLister>) -> Self {
        Self { cache, inner }
    }

    /// List files, reusing a cached result when one is live.
    pub fn list(&self, root: &Path, exclude_patterns: &[String]) -> Result<Arc<Vec<String>>> {
        let normalized = normalize_discriminators(exclude_patterns);
        let key = CacheKey::new(Self::KIND, root).list(&normalized).build();

        if let Some(CacheValue::Listing(files)) = self.cache.get(&key) {
            trace!("Listing cache hit: {}", key);
            return Ok(files);
        }

        trace!("Listing cache miss: {}", key);
        let files = Arc::new(self.inner.list(root, &normalized)?);
        self.cache.set(key, CacheValue::Listing(files.clone()));
        Ok(files)
    }

    /// Drop every cached listing for `root`.
    pub fn invalidate(&self, root: &Path) -> usize {
        self.cache.delete_by_prefix(&CacheKey::prefix(Self::KIND, root))
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// `path` relative to `root` with `/` separators.
pub(crate) fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::clock::ManualClock;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingLister {
        calls: AtomicUsize,
    }

    impl FileLister for CountingLister {
        fn list(&self, _root: &Path, _exclude: &[String]) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["a.md".to_string()])
        }
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("README.md"), "readme").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "lib").unwrap();
        fs::write(dir.path().join("src/nested/mod.rs"), "mod").unwrap();
        fs::write(dir.path().join("src/debug.log"), "log").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "js").unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        dir
    }

    #[test]
    fn test_walk_lister_applies_exclusions() {
        let dir = fixture();
        let files = WalkLister::new()
            .list(dir.path(), &["node_modules".to_string(), "*.log".to_string()])
            .unwrap();

        assert_eq!(
            files,
            vec![
                "README.md".to_string(),
                "src/lib.rs".to_string(),
                "src/nested/mod.rs".to_string(),
            ]
        );
    }

    #[test]
    fn test_walk_lister_can_include_hidden_dirs() {
        let dir = fixture();
        let files = WalkLister::new()
            .with_hidden_dirs(true)
            .list(dir.path(), &["node_modules/**".to_string()])
            .unwrap();
        assert!(files.contains(&".git/HEAD".to_string()));
    }

    #[test]
    fn test_equivalent_exclusions_hit_cache() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: SharedCache = Arc::new(TtlCache::with_clock(30_000, clock.clone()));
        let inner = Arc::new(CountingLister {
            calls: AtomicUsize::new(0),
        });
        let lister = CachedLister::new(cache, inner.clone());
        let root = Path::new("/ws");

        lister
            .list(root, &["dist/**".to_string(), "build".to_string()])
            .unwrap();
        lister
            .list(
                root,
                &[" build ".to_string(), "dist/**".to_string(), "build".to_string()],
            )
            .unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        clock.advance(30_001);
        lister.list(root, &["build".to_string()]).unwrap();
        lister.list(root, &["dist/**".to_string(), "build".to_string()]).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);

        assert_eq!(lister.invalidate(root), 2);
    }
}
