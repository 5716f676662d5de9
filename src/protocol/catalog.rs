//! Playback catalog API types.
//!
//! A search answers `GET {catalog}/search?q=...&limit=...` with:
//!
//! ```json
//! {
//!     "results": [
//!         {
//!             "id": "4NRXx6U8ABQ",
//!             "title": "Blinding Lights",
//!             "artists": ["The Weeknd"],
//!             "duration_seconds": 200.0,
//!             "thumbnail": "https://i.ytimg.com/vi/4NRXx6U8ABQ/hqdefault.jpg"
//!         }
//!     ]
//! }
//! ```
//!
//! An ISRC lookup (`GET {catalog}/isrc/{isrc}`) answers with a single
//! result object, or 404.

use std::time::Duration;

use serde::Deserialize;
use serde_with::{formats::Flexible, serde_as, DurationSecondsWithFrac, OneOrMany};
use url::Url;

use crate::track::CandidateMetadata;

#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<CatalogTrack>,
}

#[serde_as]
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct CatalogTrack {
    pub id: String,
    pub title: String,

    /// Some catalogs credit a single artist as a plain string.
    #[serde(default, alias = "artist")]
    #[serde_as(as = "OneOrMany<_>")]
    pub artists: Vec<String>,

    #[serde(alias = "duration")]
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64, Flexible>>")]
    pub duration_seconds: Option<Duration>,

    #[serde(default)]
    pub thumbnail: Option<Url>,
}

impl From<CatalogTrack> for CandidateMetadata {
    fn from(track: CatalogTrack) -> Self {
        Self {
            id: track.id.into(),
            title: track.title,
            artists: track.artists,
            duration: track.duration_seconds.filter(|duration| !duration.is_zero()),
            artwork: track.thumbnail,
        }
    }
}
