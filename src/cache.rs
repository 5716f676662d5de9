//! Memoization of descriptor resolutions.
//!
//! Resolving a descriptor costs a catalog search, so outcomes are kept per
//! [`SourceId`]. A confirmed miss is an outcome too: it is stored as
//! [`CacheEntry::NoMatch`], which is different from the key being absent
//! ("never attempted").
//!
//! The cache is an injected capability ([`ResolutionCache`]) rather than a
//! process-wide singleton. [`MemoryCache`] is the production implementation:
//! a concurrent, bounded map with per-entry time to live. Eviction can drop
//! any key at any time, and callers simply resolve again on a miss.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use moka::sync::Cache;

use crate::track::{PlayableItem, SourceId};

/// Stored outcome of one resolution attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheEntry {
    /// The descriptor resolved to this item.
    Matched(PlayableItem),

    /// The catalog was searched and nothing acceptable was found.
    NoMatch,
}

impl CacheEntry {
    #[must_use]
    pub fn item(&self) -> Option<&PlayableItem> {
        match self {
            Self::Matched(item) => Some(item),
            Self::NoMatch => None,
        }
    }

    #[must_use]
    pub fn into_item(self) -> Option<PlayableItem> {
        match self {
            Self::Matched(item) => Some(item),
            Self::NoMatch => None,
        }
    }
}

impl From<Option<PlayableItem>> for CacheEntry {
    fn from(item: Option<PlayableItem>) -> Self {
        item.map_or(Self::NoMatch, Self::Matched)
    }
}

/// Shared store of resolution outcomes.
///
/// Implementations must tolerate concurrent `get` and `put` calls from any
/// number of resolvers. Concurrent writers of the same key may overwrite one
/// another, but a reader must only ever observe a value that was `put`.
pub trait ResolutionCache: Send + Sync {
    /// Returns the stored outcome, or `None` if the key was never stored or
    /// has been evicted.
    fn get(&self, id: &SourceId) -> Option<CacheEntry>;

    fn put(&self, id: SourceId, entry: CacheEntry);

    /// Drops every entry.
    fn invalidate_all(&self);
}

/// Cache statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently held, including confirmed misses
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

/// In-memory [`ResolutionCache`] bounded by entry count and age.
pub struct MemoryCache {
    entries: Cache<SourceId, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    /// Default maximum number of entries.
    pub const DEFAULT_CAPACITY: u64 = 10_000;

    /// Default time after which an entry is evicted.
    ///
    /// Bounds how long a confirmed miss is trusted, since catalogs grow.
    pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_secs(6 * 60 * 60);

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY, Self::DEFAULT_TIME_TO_LIVE)
    }

    #[must_use]
    pub fn with_capacity(max_capacity: u64, time_to_live: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(time_to_live)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        // Entry counts are only exact after pending evictions have run.
        self.entries.run_pending_tasks();

        CacheStats {
            entries: self.entries.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache for MemoryCache {
    fn get(&self, id: &SourceId) -> Option<CacheEntry> {
        let entry = self.entries.get(id);
        if entry.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    fn put(&self, id: SourceId, entry: CacheEntry) {
        self.entries.insert(id, entry);
    }

    fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::track::{CandidateMetadata, SourceDescriptor};

    fn item(source_id: &str, catalog_id: &str) -> PlayableItem {
        let source = Arc::new(SourceDescriptor::new(source_id, "Teardrop").with_artist("Massive Attack"));
        CandidateMetadata::new(catalog_id, "Teardrop")
            .with_artist("Massive Attack")
            .into_playable(source)
    }

    #[test]
    fn put_then_get_returns_value() {
        let cache = MemoryCache::new();
        let id = SourceId::new("67Hna13dNDkZvBpTXRIaOJ");
        let entry = CacheEntry::Matched(item(id.as_str(), "u7K72X4eo_s"));

        cache.put(id.clone(), entry.clone());
        assert_eq!(cache.get(&id), Some(entry));
    }

    #[test]
    fn confirmed_miss_differs_from_absent() {
        let cache = MemoryCache::new();
        let tried = SourceId::new("tried");
        let untried = SourceId::new("untried");

        cache.put(tried.clone(), CacheEntry::from(None));
        assert_eq!(cache.get(&tried), Some(CacheEntry::NoMatch));
        assert_eq!(cache.get(&untried), None);
    }

    #[test]
    fn invalidate_all_forgets_everything() {
        let cache = MemoryCache::new();
        cache.put(SourceId::new("a"), CacheEntry::NoMatch);
        cache.put(SourceId::new("b"), CacheEntry::Matched(item("b", "x")));

        cache.invalidate_all();
        assert_eq!(cache.get(&SourceId::new("a")), None);
        assert_eq!(cache.get(&SourceId::new("b")), None);
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = MemoryCache::new();
        cache.put(SourceId::new("a"), CacheEntry::NoMatch);

        let _ = cache.get(&SourceId::new("a"));
        let _ = cache.get(&SourceId::new("a"));
        let _ = cache.get(&SourceId::new("b"));

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn concurrent_writers_never_corrupt_entries() {
        let cache = Arc::new(MemoryCache::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for n in 0..100 {
                        let id = format!("track-{n}");
                        if worker % 2 == 0 {
                            cache.put(SourceId::new(id.clone()), CacheEntry::Matched(item(&id, &id)));
                        } else if let Some(CacheEntry::Matched(found)) = cache.get(&SourceId::new(id.clone())) {
                            assert_eq!(found.source_id().as_str(), id);
                            assert_eq!(found.id().as_str(), id);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for n in 0..100 {
            let id = SourceId::new(format!("track-{n}"));
            let entry = cache.get(&id).unwrap();
            assert_eq!(entry.item().unwrap().source_id(), &id);
        }
    }
}
