//! Resolution of source descriptors into playable items.
//!
//! A [`Resolver`] ties the playback catalog, the matcher and the resolution
//! cache together:
//!
//! 1. A cached outcome, including a cached "no match", is returned without
//!    any network access.
//! 2. Descriptors carrying an ISRC are first looked up directly.
//! 3. Otherwise the catalog is searched for "artist title" and the best
//!    candidate is accepted if its composite score exceeds the threshold.
//! 4. The outcome is cached and returned.
//!
//! Upstream failures never escape: they are logged and make that one
//! resolution a miss. Such misses are not cached, so a later attempt may
//! still succeed.

use std::sync::Arc;

use crate::{
    cache::{CacheEntry, ResolutionCache},
    catalog::CatalogClient,
    config::Config,
    error::Result,
    matcher,
    track::{PlayableItem, SourceDescriptor},
};

/// Resolves descriptors through a catalog, backed by a shared cache.
///
/// Safe to use from any number of tasks at once.
pub struct Resolver {
    catalog: Arc<dyn CatalogClient>,
    cache: Arc<dyn ResolutionCache>,
    threshold: f64,
    search_limit: usize,
}

impl Resolver {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogClient>, cache: Arc<dyn ResolutionCache>) -> Self {
        Self {
            catalog,
            cache,
            threshold: Config::DEFAULT_MATCH_THRESHOLD,
            search_limit: Config::DEFAULT_SEARCH_LIMIT,
        }
    }

    #[must_use]
    pub fn from_config(
        config: &Config,
        catalog: Arc<dyn CatalogClient>,
        cache: Arc<dyn ResolutionCache>,
    ) -> Self {
        Self::new(catalog, cache)
            .with_threshold(config.match_threshold)
            .with_search_limit(config.search_limit)
    }

    /// Sets the score a best candidate must exceed to be accepted.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ResolutionCache> {
        &self.cache
    }

    /// Search string for a descriptor: main artist and title, or just the
    /// title when no artist is credited. `None` if that would be empty.
    #[must_use]
    pub fn query(descriptor: &SourceDescriptor) -> Option<String> {
        let title = descriptor.title.trim();
        let query = match descriptor.main_artist() {
            Some(artist) => format!("{} {title}", artist.trim()),
            None => title.to_owned(),
        };

        let query = query.trim();
        (!query.is_empty()).then(|| query.to_owned())
    }

    /// Resolves one descriptor, returning `None` when there is no
    /// acceptable match or the catalog could not be reached.
    pub async fn resolve(&self, descriptor: &Arc<SourceDescriptor>) -> Option<PlayableItem> {
        if let Some(entry) = self.cache.get(&descriptor.id) {
            debug!("cache hit for {}", descriptor.id);
            return entry.into_item();
        }

        match self.lookup(descriptor).await {
            Ok(item) => {
                self.cache
                    .put(descriptor.id.clone(), CacheEntry::from(item.clone()));
                item
            }
            Err(e) => {
                warn!("resolving {descriptor} failed: {e}");
                None
            }
        }
    }

    /// Resolves descriptors concurrently, one task each.
    ///
    /// The result has one slot per descriptor, in input order. If the
    /// returned future is dropped the tasks keep running to completion, so
    /// their outcomes still end up in the cache.
    pub async fn resolve_batch(
        self: &Arc<Self>,
        descriptors: &[Arc<SourceDescriptor>],
    ) -> Vec<Option<PlayableItem>> {
        let handles: Vec<_> = descriptors
            .iter()
            .map(|descriptor| {
                let resolver = Arc::clone(self);
                let descriptor = Arc::clone(descriptor);
                tokio::spawn(async move { resolver.resolve(&descriptor).await })
            })
            .collect();

        let mut resolved = Vec::with_capacity(handles.len());
        for (handle, descriptor) in handles.into_iter().zip(descriptors) {
            match handle.await {
                Ok(item) => resolved.push(item),
                Err(e) => {
                    warn!("resolution task for {} failed: {e}", descriptor.id);
                    resolved.push(None);
                }
            }
        }

        resolved
    }

    /// Finds the item for a descriptor on the catalog.
    ///
    /// `Ok(None)` is a confirmed miss; `Err` means the catalog could not
    /// answer.
    async fn lookup(&self, descriptor: &Arc<SourceDescriptor>) -> Result<Option<PlayableItem>> {
        if descriptor.isrc.is_some() {
            match self.catalog.resolve_direct(descriptor).await {
                Ok(Some(item)) => {
                    debug!("{} resolved directly to {item}", descriptor.id);
                    return Ok(Some(item));
                }
                Ok(None) => {}
                Err(e) => warn!("direct lookup of {} failed, searching instead: {e}", descriptor.id),
            }
        }

        let Some(query) = Self::query(descriptor) else {
            debug!("{} has neither title nor artist to search for", descriptor.id);
            return Ok(None);
        };

        let candidates = self.catalog.search(&query, self.search_limit).await?;
        let Some(best) = matcher::best_match(descriptor, candidates) else {
            debug!("no candidates for {descriptor}");
            return Ok(None);
        };

        if best.score > self.threshold {
            debug!(
                "{} matched {} with score {:.3} (title {:.2}, artist {:.2}, duration {:.2})",
                descriptor.id, best.candidate.id, best.score, best.title, best.artist, best.duration
            );
            Ok(Some(best.candidate.into_playable(Arc::clone(descriptor))))
        } else {
            debug!(
                "rejected {} for {descriptor}: score {:.3} not above {:.3}",
                best.candidate.id, best.score, self.threshold
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, time::Duration};

    use super::*;
    use crate::{
        cache::MemoryCache,
        testing::{FakeCache, FakeCatalog},
        track::CandidateMetadata,
    };

    fn resolver(catalog: &Arc<FakeCatalog>) -> (Arc<Resolver>, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let resolver = Resolver::new(
            Arc::clone(catalog) as Arc<dyn CatalogClient>,
            Arc::clone(&cache) as Arc<dyn ResolutionCache>,
        );
        (Arc::new(resolver), cache)
    }

    fn descriptor(id: &str, artist: &str, title: &str, secs: u64) -> Arc<SourceDescriptor> {
        Arc::new(
            SourceDescriptor::new(id, title)
                .with_artist(artist)
                .with_duration(Duration::from_secs(secs)),
        )
    }

    #[test]
    fn query_is_artist_then_title() {
        let with_artist = descriptor("1", "Radiohead", "Karma Police", 264);
        assert_eq!(Resolver::query(&with_artist).as_deref(), Some("Radiohead Karma Police"));

        let without_artist = SourceDescriptor::new("2", "Karma Police");
        assert_eq!(Resolver::query(&without_artist).as_deref(), Some("Karma Police"));

        let blank = SourceDescriptor::new("3", "  ").with_artist(" ");
        assert_eq!(Resolver::query(&blank), None);
    }

    #[tokio::test]
    async fn repeated_resolution_searches_once() {
        let catalog = Arc::new(FakeCatalog::new().with_track(
            CandidateMetadata::new("8K7l6QFkMr8", "Karma Police")
                .with_artist("Radiohead")
                .with_duration(Duration::from_secs(263)),
        ));
        let (resolver, _) = resolver(&catalog);
        let source = descriptor("63OQupATfueTdZMWTxW03A", "Radiohead", "Karma Police", 264);

        let first = resolver.resolve(&source).await.unwrap();
        let second = resolver.resolve(&source).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.id().as_str(), "8K7l6QFkMr8");
        assert_eq!(first.source_id(), &source.id);
        assert_eq!(catalog.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn low_score_is_cached_as_no_match() {
        let catalog = Arc::new(FakeCatalog::new().with_track(
            CandidateMetadata::new("x", "Karma Police")
                .with_artist("Scala & Kolacny Brothers")
                .with_duration(Duration::from_secs(200)),
        ));
        let (resolver, cache) = resolver(&catalog);
        let source = descriptor("63OQupATfueTdZMWTxW03A", "Radiohead", "Karma Police", 264);

        assert_eq!(resolver.resolve(&source).await, None);
        assert_eq!(cache.get(&source.id), Some(CacheEntry::NoMatch));

        assert_eq!(resolver.resolve(&source).await, None);
        assert_eq!(catalog.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn injected_cache_is_consulted_before_searching() {
        let catalog = Arc::new(FakeCatalog::new().with_track(
            CandidateMetadata::new("8K7l6QFkMr8", "Karma Police").with_artist("Radiohead"),
        ));
        let cache = Arc::new(FakeCache::new());
        let resolver = Resolver::new(
            Arc::clone(&catalog) as Arc<dyn CatalogClient>,
            Arc::clone(&cache) as Arc<dyn ResolutionCache>,
        );
        let source = descriptor("63OQupATfueTdZMWTxW03A", "Radiohead", "Karma Police", 264);

        assert!(resolver.resolve(&source).await.is_some());
        assert!(resolver.resolve(&source).await.is_some());

        assert_eq!(cache.gets.load(Ordering::SeqCst), 2);
        assert_eq!(cache.puts.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(catalog.searches.load(Ordering::SeqCst), 1);

        cache.invalidate_all();
        assert!(resolver.resolve(&source).await.is_some());
        assert_eq!(catalog.searches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn catalog_failure_is_a_miss_but_not_cached() {
        let catalog = Arc::new(FakeCatalog::new().failing_on("Karma Police"));
        let (resolver, cache) = resolver(&catalog);
        let source = descriptor("63OQupATfueTdZMWTxW03A", "Radiohead", "Karma Police", 264);

        assert_eq!(resolver.resolve(&source).await, None);
        assert_eq!(cache.get(&source.id), None);

        assert_eq!(resolver.resolve(&source).await, None);
        assert_eq!(catalog.searches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn isrc_lookup_skips_search() {
        let catalog = Arc::new(FakeCatalog::new().with_isrc(
            "GBAYE9700219",
            CandidateMetadata::new("8K7l6QFkMr8", "Karma Police").with_artist("Radiohead"),
        ));
        let (resolver, _) = resolver(&catalog);
        let source = Arc::new(
            SourceDescriptor::new("63OQupATfueTdZMWTxW03A", "Karma Police")
                .with_artist("Radiohead")
                .with_isrc("GBAYE9700219"),
        );

        let item = resolver.resolve(&source).await.unwrap();
        assert_eq!(item.id().as_str(), "8K7l6QFkMr8");
        assert_eq!(catalog.direct_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_isrc_falls_back_to_search() {
        let catalog = Arc::new(FakeCatalog::new().with_track(
            CandidateMetadata::new("8K7l6QFkMr8", "Karma Police").with_artist("Radiohead"),
        ));
        let (resolver, _) = resolver(&catalog);
        let source = Arc::new(
            SourceDescriptor::new("63OQupATfueTdZMWTxW03A", "Karma Police")
                .with_artist("Radiohead")
                .with_isrc("GBAYE9700219"),
        );

        assert!(resolver.resolve(&source).await.is_some());
        assert_eq!(catalog.direct_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_keeps_input_order_and_isolates_failures() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .with_track(CandidateMetadata::new("a", "Teardrop").with_artist("Massive Attack"))
                .with_track(CandidateMetadata::new("c", "Angel").with_artist("Massive Attack"))
                .failing_on("Unfinished Sympathy"),
        );
        let (resolver, _) = resolver(&catalog);

        let batch = [
            descriptor("1", "Massive Attack", "Teardrop", 330),
            descriptor("2", "Massive Attack", "Unfinished Sympathy", 308),
            descriptor("3", "Massive Attack", "Angel", 379),
        ];
        let resolved = resolver.resolve_batch(&batch).await;

        let ids: Vec<_> = resolved
            .iter()
            .map(|item| item.as_ref().map(|item| item.id().as_str()))
            .collect();
        assert_eq!(ids, vec![Some("a"), None, Some("c")]);
    }
}
