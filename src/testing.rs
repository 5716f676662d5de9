//! In-memory upstreams with call counters for unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    cache::{CacheEntry, ResolutionCache},
    catalog::CatalogClient,
    error::{Error, Result},
    gateway::{Collection, ListingItem, Page, SourceListingClient},
    track::{CandidateMetadata, PlayableItem, SourceDescriptor, SourceId},
};

/// A catalog whose search returns every track with a title that ends the
/// query, leaving the ranking to the matcher.
#[derive(Default)]
pub struct FakeCatalog {
    tracks: Vec<CandidateMetadata>,
    isrc: HashMap<String, CandidateMetadata>,
    failing: Vec<String>,

    pub searches: AtomicUsize,
    pub direct_lookups: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, track: CandidateMetadata) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn with_isrc(mut self, isrc: &str, track: CandidateMetadata) -> Self {
        self.isrc.insert(isrc.to_owned(), track);
        self
    }

    /// Fails every search whose query contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_owned());
        self
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidateMetadata>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.failing.iter().any(|needle| query.contains(needle.as_str())) {
            return Err(Error::unavailable(format!("search for {query:?} failed")));
        }

        let query = query.to_lowercase();
        Ok(self
            .tracks
            .iter()
            .filter(|track| query.ends_with(&track.title.to_lowercase()))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn resolve_direct(&self, descriptor: &Arc<SourceDescriptor>) -> Result<Option<PlayableItem>> {
        self.direct_lookups.fetch_add(1, Ordering::SeqCst);

        Ok(descriptor
            .isrc
            .as_ref()
            .and_then(|isrc| self.isrc.get(isrc))
            .map(|track| track.clone().into_playable(Arc::clone(descriptor))))
    }
}

/// A single listing served in pages, plus a fixed recommendation set.
#[derive(Default)]
pub struct FakeListing {
    items: Vec<ListingItem>,
    recommendations: Vec<SourceDescriptor>,
    fail_at_offset: Option<usize>,

    pub pages: AtomicUsize,
    pub recommendation_calls: AtomicUsize,
}

impl FakeListing {
    pub fn new(items: Vec<ListingItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// A listing of available tracks `track-0`, `track-1`, ...
    pub fn numbered(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|n| ListingItem::Track(numbered_track(n)))
                .collect(),
        )
    }

    pub fn with_recommendations(mut self, recommendations: Vec<SourceDescriptor>) -> Self {
        self.recommendations = recommendations;
        self
    }

    /// Fails the page request starting at `offset`.
    pub fn failing_at(mut self, offset: usize) -> Self {
        self.fail_at_offset = Some(offset);
        self
    }
}

/// Descriptor `track-{n}` titled `Song {n}` by `Artist {n}`.
pub fn numbered_track(n: usize) -> SourceDescriptor {
    SourceDescriptor::new(format!("track-{n}"), format!("Song {n}")).with_artist(format!("Artist {n}"))
}

#[async_trait]
impl SourceListingClient for FakeListing {
    async fn fetch_page(&self, collection: &Collection, offset: usize, limit: usize) -> Result<Page> {
        self.pages.fetch_add(1, Ordering::SeqCst);

        if self.fail_at_offset == Some(offset) {
            return Err(Error::unavailable(format!("{collection} offset {offset} failed")));
        }

        let items = self
            .items
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total: self.items.len(),
        })
    }

    async fn recommendations(&self, _seed: &SourceId, limit: usize) -> Result<Vec<SourceDescriptor>> {
        self.recommendation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.recommendations.iter().take(limit).cloned().collect())
    }

    async fn track(&self, id: &SourceId) -> Result<SourceDescriptor> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ListingItem::Track(descriptor) => Some(descriptor),
                ListingItem::Unavailable(_) => None,
            })
            .chain(&self.recommendations)
            .find(|descriptor| &descriptor.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("track {id}")))
    }
}

/// A catalog that knows exactly the numbered tracks in `ns`.
pub fn numbered_catalog(ns: impl IntoIterator<Item = usize>) -> FakeCatalog {
    ns.into_iter().fold(FakeCatalog::new(), |catalog, n| {
        catalog.with_track(
            CandidateMetadata::new(format!("catalog-{n}").as_str(), format!("Song {n}"))
                .with_artist(format!("Artist {n}")),
        )
    })
}

/// A plain map that counts how it is used.
#[derive(Default)]
pub struct FakeCache {
    entries: Mutex<HashMap<SourceId, CacheEntry>>,

    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl FakeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl ResolutionCache for FakeCache {
    fn get(&self, id: &SourceId) -> Option<CacheEntry> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().get(id).cloned()
    }

    fn put(&self, id: SourceId, entry: CacheEntry) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().insert(id, entry);
    }

    fn invalidate_all(&self) {
        self.entries.lock().unwrap().clear();
    }
}
