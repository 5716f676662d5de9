//! Progressive playback queue.
//!
//! A [`ProgressiveQueue`] turns a source listing into playable items as
//! playback needs them:
//!
//! * [`start`](ProgressiveQueue::start) fetches just enough pages to cover
//!   the requested position and resolves only that one descriptor, so the
//!   first item is available after a single resolution.
//! * [`advance`](ProgressiveQueue::advance) resolves the next batch of
//!   descriptors concurrently, fetching another page first when all fetched
//!   descriptors have been consumed.
//! * [`has_more`](ProgressiveQueue::has_more) tells whether `advance` can
//!   still produce anything.
//!
//! The queue only moves forward. An index is resolved at most once, and
//! descriptors that fail to resolve are dropped rather than retried or
//! represented by placeholders. Nothing in here returns an error: upstream
//! failures are logged and turn into fewer items.

use std::sync::Arc;

use crate::{
    config::Config,
    gateway::{Collection, SourceListingClient},
    pager::SourcePager,
    resolver::Resolver,
    track::{PlayableItem, SourceDescriptor},
};

/// Position of a queue within its listing.
///
/// Upholds `resolve_offset <= fetched <= total` once the total is known.
pub struct QueueCursor {
    pager: SourcePager,

    /// Index of the next fetched descriptor to resolve.
    resolve_offset: usize,
}

impl QueueCursor {
    #[must_use]
    pub fn new(pager: SourcePager) -> Self {
        Self {
            pager,
            resolve_offset: 0,
        }
    }

    #[must_use]
    pub fn pager(&self) -> &SourcePager {
        &self.pager
    }

    #[must_use]
    pub fn resolve_offset(&self) -> usize {
        self.resolve_offset
    }

    /// Number of fetched descriptors not yet resolved.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pager.len().saturating_sub(self.resolve_offset)
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.pending() > 0 || self.pager.has_more()
    }

    /// Fetches one page, logging instead of returning a failure.
    async fn fetch_next(&mut self) {
        if let Err(e) = self.pager.fetch_next().await {
            warn!("fetching source listing failed, treating it as complete: {e}");
        }
    }

    /// Takes up to `count` descriptors from the cursor onwards.
    fn take(&mut self, count: usize) -> Vec<Arc<SourceDescriptor>> {
        let start = self.resolve_offset.min(self.pager.len());
        let end = start.saturating_add(count).min(self.pager.len());
        self.resolve_offset = end;
        self.pager.descriptors()[start..end].to_vec()
    }
}

/// The items a queue starts playback with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueSnapshot {
    /// Zero or one item: the resolved start descriptor.
    pub items: Vec<PlayableItem>,

    /// Position of the start descriptor in the listing, after clamping.
    pub start_index: usize,
}

impl QueueSnapshot {
    /// Whether nothing playable was found at the start position.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Queue of playable items resolved on demand from a source listing.
///
/// Owns its cursor exclusively; any number of queues may share a
/// [`Resolver`] and therefore its cache.
pub struct ProgressiveQueue {
    cursor: QueueCursor,
    resolver: Arc<Resolver>,
    batch_size: usize,
}

impl ProgressiveQueue {
    #[must_use]
    pub fn new(pager: SourcePager, resolver: Arc<Resolver>) -> Self {
        Self {
            cursor: QueueCursor::new(pager),
            resolver,
            batch_size: Config::DEFAULT_BATCH_SIZE,
        }
    }

    /// Queue over a paginated playlist or album.
    #[must_use]
    pub fn for_collection(
        config: &Config,
        client: Arc<dyn SourceListingClient>,
        collection: Collection,
        resolver: Arc<Resolver>,
    ) -> Self {
        Self::new(SourcePager::new(client, collection, config.page_size), resolver)
            .with_batch_size(config.batch_size)
    }

    /// Queue starting with `seed`, followed by its recommendations.
    #[must_use]
    pub fn for_recommendations(
        config: &Config,
        client: Arc<dyn SourceListingClient>,
        seed: SourceDescriptor,
        resolver: Arc<Resolver>,
    ) -> Self {
        Self::new(
            SourcePager::recommendations(client, seed, config.recommendation_limit),
            resolver,
        )
        .with_batch_size(config.batch_size)
    }

    /// Queue over a list of descriptors the caller already has.
    #[must_use]
    pub fn for_descriptors(
        descriptors: impl IntoIterator<Item = SourceDescriptor>,
        resolver: Arc<Resolver>,
    ) -> Self {
        Self::new(SourcePager::from_descriptors(descriptors), resolver)
    }

    /// Sets how many descriptors one `advance` resolves concurrently.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn cursor(&self) -> &QueueCursor {
        &self.cursor
    }

    /// Resolves the descriptor at `index` to start playback with.
    ///
    /// Pages are fetched until `index` is covered or the listing is
    /// exhausted. An index beyond the end is clamped to the last descriptor.
    /// Only that one descriptor is resolved; the cursor continues right
    /// after it.
    ///
    /// Returns an empty snapshot if the listing is empty or the descriptor
    /// cannot be resolved.
    pub async fn start(&mut self, index: usize) -> QueueSnapshot {
        while self.cursor.pager.len() <= index && self.cursor.pager.has_more() {
            self.cursor.fetch_next().await;
        }

        let Some(last) = self.cursor.pager.len().checked_sub(1) else {
            info!("queue is empty");
            self.cursor.resolve_offset = 0;
            return QueueSnapshot::default();
        };

        let start_index = index.min(last);
        if start_index != index {
            debug!("start index {index} clamped to {start_index}");
        }

        let descriptor = Arc::clone(&self.cursor.pager.descriptors()[start_index]);
        self.cursor.resolve_offset = start_index + 1;

        let items: Vec<_> = self.resolver.resolve(&descriptor).await.into_iter().collect();
        if items.is_empty() {
            info!("nothing playable at start index {start_index} ({descriptor})");
        } else {
            info!("starting queue at index {start_index} with {}", items[0]);
        }

        QueueSnapshot { items, start_index }
    }

    /// Whether [`advance`](Self::advance) may still produce items.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }

    /// Resolves the next batch, in listing order.
    ///
    /// Descriptors that fail to resolve are left out, so the result may be
    /// shorter than the batch or even empty while [`has_more`] is still
    /// true. Returns an empty result once there is nothing left.
    ///
    /// The cursor moves past the batch before it is resolved: if the
    /// returned future is dropped, the batch is skipped, but its
    /// resolutions still complete in the background and fill the cache.
    ///
    /// [`has_more`]: Self::has_more
    pub async fn advance(&mut self) -> Vec<PlayableItem> {
        while self.cursor.pending() == 0 && self.cursor.pager.has_more() {
            self.cursor.fetch_next().await;
        }

        let batch = self.cursor.take(self.batch_size);
        if batch.is_empty() {
            info!("queue exhausted");
            return Vec::new();
        }

        let first = self.cursor.resolve_offset - batch.len();
        debug!(
            "resolving {} descriptors at indices {first}..{}",
            batch.len(),
            self.cursor.resolve_offset
        );

        let resolved: Vec<_> = self
            .resolver
            .resolve_batch(&batch)
            .await
            .into_iter()
            .flatten()
            .collect();

        if resolved.len() < batch.len() {
            debug!("{} of {} descriptors unresolved", batch.len() - resolved.len(), batch.len());
        }

        resolved
    }
}
