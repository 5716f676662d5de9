//! Access to the playback catalog.
//!
//! [`CatalogClient`] is what the resolver consumes; [`Catalog`] implements
//! it against the catalog's HTTP API.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::catalog::{CatalogTrack, SearchResponse},
    token::AuthProvider,
    track::{CandidateMetadata, PlayableItem, SourceDescriptor},
};

/// Search and direct lookup on the playback catalog.
///
/// Failures keep their kind (`NotFound` versus `Unavailable` and friends),
/// even though the resolver treats all of them as "no result".
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Returns up to `limit` candidates for a free-text query.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidateMetadata>>;

    /// Resolves a descriptor without searching, if it carries enough
    /// information for that.
    ///
    /// The default finds nothing, so the resolver falls back to search.
    async fn resolve_direct(&self, _descriptor: &Arc<SourceDescriptor>) -> Result<Option<PlayableItem>> {
        Ok(None)
    }
}

/// HTTP client of the playback catalog.
pub struct Catalog {
    http_client: HttpClient,
    base_url: Url,

    /// Public catalogs need no authorization.
    auth: Option<Arc<dyn AuthProvider>>,
}

impl Catalog {
    /// # Errors
    ///
    /// Will return `Err` if no catalog URL is configured or the HTTP client
    /// cannot be built.
    pub fn new(config: &Config, auth: Option<Arc<dyn AuthProvider>>) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            base_url: config.catalog_url()?.clone(),
            auth,
        })
    }

    fn search_url(&self, query: &str, limit: usize) -> Result<Url> {
        let mut url = self.base_url.join("search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    fn isrc_url(&self, isrc: &str) -> Result<Url> {
        let mut url = self.base_url.join("isrc/")?;
        url.path_segments_mut()
            .map_err(|()| Error::invalid_argument("catalog url cannot be a base"))?
            .pop_if_empty()
            .push(isrc);
        Ok(url)
    }
}

#[async_trait]
impl CatalogClient for Catalog {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidateMetadata>> {
        let url = self.search_url(query, limit)?;
        let response: SearchResponse = self
            .http_client
            .get_json(url, self.auth.as_deref(), "catalog search")
            .await?;

        Ok(response
            .results
            .into_iter()
            .take(limit)
            .map(Into::into)
            .collect())
    }

    async fn resolve_direct(&self, descriptor: &Arc<SourceDescriptor>) -> Result<Option<PlayableItem>> {
        let Some(isrc) = descriptor.isrc.as_deref() else {
            return Ok(None);
        };

        let url = self.isrc_url(isrc)?;
        match self
            .http_client
            .get_json::<CatalogTrack>(url, self.auth.as_deref(), "catalog isrc")
            .await
        {
            Ok(track) => {
                let candidate = CandidateMetadata::from(track);
                Ok(Some(candidate.into_playable(Arc::clone(descriptor))))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticToken;

    fn catalog() -> Catalog {
        let mut config = Config::new().unwrap();
        config.catalog_url = Some(Url::parse("https://catalog.example.com/api/").unwrap());
        Catalog::new(&config, Some(Arc::new(StaticToken::new("token".parse().unwrap())))).unwrap()
    }

    #[test]
    fn builds_search_url() {
        let url = catalog().search_url("Daft Punk One More Time", 10).unwrap();
        assert_eq!(
            url.as_str(),
            "https://catalog.example.com/api/search?q=Daft+Punk+One+More+Time&limit=10"
        );
    }

    #[test]
    fn builds_isrc_url() {
        let url = catalog().isrc_url("GBDUW0000059").unwrap();
        assert_eq!(url.as_str(), "https://catalog.example.com/api/isrc/GBDUW0000059");
    }

    #[test]
    fn requires_catalog_url() {
        let config = Config::new().unwrap();
        assert!(Catalog::new(&config, None).is_err());
    }

    #[tokio::test]
    async fn direct_lookup_needs_isrc() {
        let descriptor = Arc::new(SourceDescriptor::new("1", "Untitled"));
        assert_eq!(catalog().resolve_direct(&descriptor).await.unwrap(), None);
    }
}
