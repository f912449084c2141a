//! Time-to-live cache shared by the listing and scanning components.
//!
//! Entries expire a fixed interval after they were written. Reads never
//! refresh an entry; expired entries are dropped lazily on `get` and
//! proactively on every `set`.

use crate::clock::{Clock, SystemClock};
use crate::scanner::TagScanState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Default expiry window in milliseconds.
pub const DEFAULT_TTL_MS: u64 = 30_000;

/// Values stored in the process-wide cache.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// Workspace-relative file list produced by a [`crate::FileLister`].
    Listing(Arc<Vec<String>>),
    /// Per-file signatures and findings of the tag scanner.
    TagScan(Arc<TagScanState>),
}

/// The cache every component shares.
pub type SharedCache = Arc<TtlCache<CacheValue>>;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    stored_at_ms: u64,
}

/// Snapshot of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of live and not-yet-pruned entries
    pub size: usize,
    /// Keys currently stored, sorted
    pub keys: Vec<String>,
}

/// Key/value store with a fixed time-to-live.
pub struct TtlCache<V> {
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache using the system clock.
    pub fn new(ttl_ms: u64) -> Self {
        Self::with_clock(ttl_ms, Arc::new(SystemClock))
    }

    /// Create a cache with an injected clock.
    pub fn with_clock(ttl_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl_ms,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured time-to-live.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Return a copy of the stored value unless it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            trace!("Cache entry expired: {}", key);
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or overwrite a value, pruning expired entries first.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        Self::prune_locked(&mut entries, self.ttl_ms, now);
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at_ms: now,
            },
        );
    }

    /// Remove one entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop all expired entries and return how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        Self::prune_locked(&mut entries, self.ttl_ms, now)
    }

    /// Current size and keys.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: entries.len(),
            keys,
        }
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: u64) -> bool {
        now.saturating_sub(entry.stored_at_ms) > self.ttl_ms
    }

    fn prune_locked(entries: &mut HashMap<String, CacheEntry<V>>, ttl_ms: u64, now: u64) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_sub(entry.stored_at_ms) <= ttl_ms);
        let removed = before - entries.len();
        if removed > 0 {
            trace!("Pruned {} expired cache entries", removed);
        }
        removed
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_MS)
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl_ms", &self.ttl_ms)
            .field("size", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_at(start: u64) -> (TtlCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        (TtlCache::with_clock(30_000, clock.clone()), clock)
    }

    #[test]
    fn test_value_lives_until_ttl_boundary() {
        let (cache, clock) = cache_at(1_000);
        cache.set("a", 1);

        clock.advance(30_000);
        assert_eq!(cache.get("a"), Some(1));

        clock.advance(1);
        assert_eq!(cache.get("a"), None);
        // Expired reads evict.
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_reads_do_not_refresh() {
        let (cache, clock) = cache_at(0);
        cache.set("a", 1);

        clock.advance(20_000);
        assert_eq!(cache.get("a"), Some(1));
        clock.advance(20_000);
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_set_prunes_expired_entries() {
        let (cache, clock) = cache_at(0);
        cache.set("old", 1);
        clock.advance(40_000);
        cache.set("new", 2);

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.keys, vec!["new".to_string()]);
    }

    #[test]
    fn test_overwrite_resets_timestamp() {
        let (cache, clock) = cache_at(0);
        cache.set("a", 1);
        clock.advance(25_000);
        cache.set("a", 2);
        clock.advance(25_000);
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn test_delete_and_prefix_delete() {
        let (cache, _clock) = cache_at(0);
        cache.set("listing:/a:x", 1);
        cache.set("listing:/a:y", 2);
        cache.set("scan:/a", 3);

        assert!(cache.delete("scan:/a"));
        assert!(!cache.delete("scan:/a"));
        assert_eq!(cache.delete_by_prefix("listing:/a"), 2);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_prune_expired_counts() {
        let (cache, clock) = cache_at(0);
        cache.set("a", 1);
        cache.set("b", 2);
        clock.advance(10_000);
        cache.set("c", 3);
        clock.advance(25_000);

        assert_eq!(cache.prune_expired(), 2);
        assert_eq!(cache.stats().keys, vec!["c".to_string()]);

        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }
}
