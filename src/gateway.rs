//! Access to the source catalog.
//!
//! [`SourceListingClient`] is what the pager consumes; [`Gateway`]
//! implements it against the source catalog's Web API.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::source::{Paging, PlaylistItem, Recommendations, Track},
    token::AuthProvider,
    track::{SourceDescriptor, SourceId},
};

/// A paginated listing on the source catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Playlist(String),
    Album(String),
}

impl Collection {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Playlist(id) | Self::Album(id) => id,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playlist(id) => write!(f, "playlist {id}"),
            Self::Album(id) => write!(f, "album {id}"),
        }
    }
}

/// One entry of a listing page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingItem {
    Track(SourceDescriptor),

    /// A local file, a track that is not playable in the user's market, or
    /// one that was removed from the catalog.
    Unavailable(Option<SourceId>),
}

impl ListingItem {
    #[must_use]
    pub fn into_descriptor(self) -> Option<SourceDescriptor> {
        match self {
            Self::Track(descriptor) => Some(descriptor),
            Self::Unavailable(_) => None,
        }
    }
}

/// One page of a listing as served upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    /// Entries in listing order, unavailable ones included.
    pub items: Vec<ListingItem>,

    /// Authoritative number of entries in the complete listing.
    pub total: usize,
}

/// Paginated listings and recommendations on the source catalog.
#[async_trait]
pub trait SourceListingClient: Send + Sync {
    async fn fetch_page(&self, collection: &Collection, offset: usize, limit: usize) -> Result<Page>;

    /// Returns up to `limit` tracks recommended for `seed`.
    async fn recommendations(&self, seed: &SourceId, limit: usize) -> Result<Vec<SourceDescriptor>>;

    async fn track(&self, id: &SourceId) -> Result<SourceDescriptor>;
}

/// HTTP client of the source catalog Web API.
pub struct Gateway {
    http_client: HttpClient,
    base_url: Url,
    auth: Arc<dyn AuthProvider>,
}

impl Gateway {
    /// Makes the API report `is_playable` for the user's own market.
    const MARKET: &'static str = "from_token";

    /// # Errors
    ///
    /// Will return `Err` if the HTTP client cannot be built.
    pub fn new(config: &Config, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            base_url: config.source_url.clone(),
            auth,
        })
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::invalid_argument("source url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    fn page_url(&self, collection: &Collection, offset: usize, limit: usize) -> Result<Url> {
        let kind = match collection {
            Collection::Playlist(_) => "playlists",
            Collection::Album(_) => "albums",
        };

        self.url(
            &[kind, collection.id(), "tracks"],
            &[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("market", Self::MARKET.to_owned()),
            ],
        )
    }
}

#[async_trait]
impl SourceListingClient for Gateway {
    async fn fetch_page(&self, collection: &Collection, offset: usize, limit: usize) -> Result<Page> {
        let url = self.page_url(collection, offset, limit)?;
        let auth = Some(self.auth.as_ref());

        match collection {
            Collection::Playlist(_) => {
                let page: Paging<PlaylistItem> =
                    self.http_client.get_json(url, auth, "playlist tracks").await?;
                Ok(Page {
                    items: page.items.into_iter().map(Into::into).collect(),
                    total: page.total,
                })
            }
            Collection::Album(id) => {
                let page: Paging<Track> = self.http_client.get_json(url, auth, "album tracks").await?;

                // Album listings leave out the album they belong to.
                let items = page
                    .items
                    .into_iter()
                    .map(|track| match ListingItem::from(track) {
                        ListingItem::Track(mut descriptor) => {
                            descriptor.album_id.get_or_insert_with(|| id.clone());
                            ListingItem::Track(descriptor)
                        }
                        unavailable @ ListingItem::Unavailable(_) => unavailable,
                    })
                    .collect();

                Ok(Page {
                    items,
                    total: page.total,
                })
            }
        }
    }

    async fn recommendations(&self, seed: &SourceId, limit: usize) -> Result<Vec<SourceDescriptor>> {
        let url = self.url(
            &["recommendations"],
            &[
                ("seed_tracks", seed.to_string()),
                ("limit", limit.to_string()),
                ("market", Self::MARKET.to_owned()),
            ],
        )?;

        let response: Recommendations = self
            .http_client
            .get_json(url, Some(self.auth.as_ref()), "recommendations")
            .await?;

        Ok(response
            .tracks
            .into_iter()
            .filter_map(|track| ListingItem::from(track).into_descriptor())
            .collect())
    }

    async fn track(&self, id: &SourceId) -> Result<SourceDescriptor> {
        let url = self.url(
            &["tracks", id.as_str()],
            &[("market", Self::MARKET.to_owned())],
        )?;

        let track: Track = self.http_client.get_json(url, Some(self.auth.as_ref()), "track").await?;
        track
            .into_descriptor()
            .ok_or_else(|| Error::not_found(format!("track {id} has no catalog id")))
    }
}
