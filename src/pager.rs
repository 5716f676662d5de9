//! Incremental fetching of source listings.
//!
//! A [`SourcePager`] accumulates the descriptors of one listing, a page at a
//! time:
//!
//! ```text
//! Uninitialized -> Fetching -> HasMore -> Fetching -> ... -> Exhausted
//! ```
//!
//! The offset advances by the number of entries the upstream actually
//! returned, which may be fewer than requested. Entries the source flags as
//! unavailable still count towards the offset but are not kept. A failed
//! fetch exhausts the pager: the listing is treated as complete rather than
//! retried.
//!
//! Besides paginated collections a pager can hold an already complete list,
//! or a seed track followed by one fixed batch of recommendations.

use std::{collections::HashSet, fmt, sync::Arc};

use crate::{
    config::Config,
    error::Result,
    gateway::{Collection, ListingItem, SourceListingClient},
    track::{SourceDescriptor, SourceId},
};

/// Pagination state of a [`SourcePager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PagerState {
    /// Nothing fetched yet.
    Uninitialized,

    /// A fetch is in flight, or was abandoned halfway.
    Fetching,

    HasMore,

    /// Terminal: no further pages will be fetched.
    Exhausted,
}

impl fmt::Display for PagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Fetching => write!(f, "fetching"),
            Self::HasMore => write!(f, "has more"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

enum Listing {
    Collection {
        client: Arc<dyn SourceListingClient>,
        collection: Collection,
    },
    Recommendations {
        client: Arc<dyn SourceListingClient>,
        seed: SourceId,
        limit: usize,
    },
    Complete,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection { collection, .. } => write!(f, "{collection}"),
            Self::Recommendations { seed, .. } => write!(f, "recommendations for {seed}"),
            Self::Complete => write!(f, "track list"),
        }
    }
}

/// Accumulates the descriptors of a listing, fetching pages on request.
pub struct SourcePager {
    listing: Listing,
    descriptors: Vec<Arc<SourceDescriptor>>,
    page_size: usize,
    offset: usize,
    total: Option<usize>,
    state: PagerState,
}

impl SourcePager {
    /// Pages through a playlist or album.
    ///
    /// `page_size` is clamped to what the upstream serves.
    #[must_use]
    pub fn new(
        client: Arc<dyn SourceListingClient>,
        collection: Collection,
        page_size: usize,
    ) -> Self {
        Self {
            listing: Listing::Collection { client, collection },
            descriptors: Vec::new(),
            page_size: page_size.clamp(1, Config::MAX_PAGE_SIZE),
            offset: 0,
            total: None,
            state: PagerState::Uninitialized,
        }
    }

    /// Wraps a list the caller already has in full. Never fetches.
    #[must_use]
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = SourceDescriptor>) -> Self {
        let descriptors: Vec<_> = descriptors.into_iter().map(Arc::new).collect();
        let total = descriptors.len();

        Self {
            listing: Listing::Complete,
            descriptors,
            page_size: total,
            offset: total,
            total: Some(total),
            state: PagerState::Exhausted,
        }
    }

    /// Starts with `seed` and fetches up to `limit` recommendations for it
    /// on the first [`fetch_next`](Self::fetch_next).
    #[must_use]
    pub fn recommendations(
        client: Arc<dyn SourceListingClient>,
        seed: SourceDescriptor,
        limit: usize,
    ) -> Self {
        Self {
            listing: Listing::Recommendations {
                client,
                seed: seed.id.clone(),
                limit,
            },
            descriptors: vec![Arc::new(seed)],
            page_size: limit,
            offset: 0,
            total: None,
            state: PagerState::Uninitialized,
        }
    }

    #[must_use]
    pub fn state(&self) -> PagerState {
        self.state
    }

    /// Whether another [`fetch_next`](Self::fetch_next) may yield more.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.state != PagerState::Exhausted
    }

    /// Descriptors accumulated so far, in listing order.
    #[must_use]
    pub fn descriptors(&self) -> &[Arc<SourceDescriptor>] {
        &self.descriptors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Number of upstream entries consumed, unavailable ones included.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Upstream total, once known.
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Fetches the next page and returns how many descriptors it added.
    ///
    /// Does nothing once exhausted.
    ///
    /// # Errors
    ///
    /// Returns the upstream error after marking the pager exhausted.
    pub async fn fetch_next(&mut self) -> Result<usize> {
        if self.state == PagerState::Exhausted {
            return Ok(0);
        }

        self.state = PagerState::Fetching;
        let result = match &self.listing {
            Listing::Collection { client, collection } => client
                .fetch_page(collection, self.offset, self.page_size)
                .await
                .map(|page| (page.items.len(), page.total, page.items)),
            Listing::Recommendations {
                client,
                seed,
                limit,
            } => client
                .recommendations(seed, *limit)
                .await
                .map(|tracks| {
                    let count = tracks.len();
                    let items = tracks
                        .into_iter()
                        .map(ListingItem::Track)
                        .collect::<Vec<_>>();
                    (count, count, items)
                }),
            Listing::Complete => Ok((0, self.offset, Vec::new())),
        };

        let (count, total, items) = match result {
            Ok(page) => page,
            Err(e) => {
                self.state = PagerState::Exhausted;
                return Err(e);
            }
        };

        let before = self.descriptors.len();
        match self.listing {
            Listing::Recommendations { .. } => {
                // One fixed batch: the seed plus what was recommended for it.
                let mut seen: HashSet<SourceId> =
                    self.descriptors.iter().map(|d| d.id.clone()).collect();
                self.descriptors.extend(
                    items
                        .into_iter()
                        .filter_map(ListingItem::into_descriptor)
                        .filter(|descriptor| seen.insert(descriptor.id.clone()))
                        .map(Arc::new),
                );
                // The seed counts towards the listing as well.
                self.offset = self.descriptors.len();
                self.total = Some(self.descriptors.len());
                self.state = PagerState::Exhausted;
            }
            _ => {
                self.descriptors.extend(
                    items
                        .into_iter()
                        .filter_map(ListingItem::into_descriptor)
                        .map(Arc::new),
                );
                self.offset += count;
                self.total = Some(total);

                // An empty page cannot make progress, whatever the total says.
                self.state = if count > 0 && self.offset < total {
                    PagerState::HasMore
                } else {
                    PagerState::Exhausted
                };
            }
        }

        let added = self.descriptors.len() - before;
        debug!(
            "{}: fetched {count} entries, kept {added}, offset {} of {}, {}",
            self.listing,
            self.offset,
            self.total.unwrap_or_default(),
            self.state
        );

        Ok(added)
    }
}
