//! Source catalog Web API types.
//!
//! Listings are paginated as:
//!
//! ```json
//! {
//!     "items": [...],
//!     "limit": 100,
//!     "offset": 0,
//!     "total": 250
//! }
//! ```
//!
//! Playlist entries wrap a track together with an `is_local` flag; album
//! entries are bare tracks. Tracks removed from the catalog come back as
//! `"track": null`, local files without an `id`.

use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};

use crate::{
    gateway::ListingItem,
    track::{Artist, SourceDescriptor, SourceId},
};

/// One page of a listing.
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct Paging<T> {
    pub items: Vec<T>,

    /// Number of items in the complete listing.
    pub total: usize,

    #[serde(default)]
    pub offset: usize,
}

#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct PlaylistItem {
    #[serde(default)]
    pub is_local: bool,
    pub track: Option<Track>,
}

#[serde_as]
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct Track {
    pub id: Option<String>,
    pub uri: Option<String>,
    pub name: String,

    #[serde(default)]
    pub artists: Vec<ArtistObject>,

    /// Absent on album listings.
    pub album: Option<Album>,

    #[serde(default)]
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub duration_ms: Option<Duration>,

    pub popularity: Option<u32>,

    /// Only present when a market was requested.
    pub is_playable: Option<bool>,

    #[serde(default)]
    pub is_local: bool,

    pub external_ids: Option<ExternalIds>,
}

#[derive(Clone, PartialEq, Eq, Deserialize, Debug)]
pub struct ArtistObject {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Clone, PartialEq, Eq, Deserialize, Debug)]
pub struct Album {
    pub id: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Deserialize, Debug)]
pub struct ExternalIds {
    pub isrc: Option<String>,
}

#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct Recommendations {
    pub tracks: Vec<Track>,
}

impl Track {
    /// Whether the source reports this track as playable at all.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.is_local && self.is_playable != Some(false) && self.id.is_some()
    }

    /// Converts into a descriptor, or `None` for tracks without an ID.
    #[must_use]
    pub fn into_descriptor(self) -> Option<SourceDescriptor> {
        let id = self.id?;

        Some(SourceDescriptor {
            id: SourceId::new(id),
            title: self.name,
            artists: self
                .artists
                .into_iter()
                .map(|artist| Artist {
                    id: artist.id,
                    name: artist.name,
                })
                .collect(),
            album_id: self.album.and_then(|album| album.id),
            duration: self.duration_ms.filter(|duration| !duration.is_zero()),
            popularity: self.popularity,
            isrc: self
                .external_ids
                .and_then(|ids| ids.isrc)
                .filter(|isrc| !isrc.trim().is_empty()),
        })
    }
}

impl From<Track> for ListingItem {
    fn from(track: Track) -> Self {
        if !track.is_available() {
            return Self::Unavailable(track.id.or(track.uri).map(SourceId::new));
        }

        match track.into_descriptor() {
            Some(descriptor) => Self::Track(descriptor),
            None => Self::Unavailable(None),
        }
    }
}

impl From<PlaylistItem> for ListingItem {
    fn from(item: PlaylistItem) -> Self {
        match item.track {
            Some(mut track) => {
                track.is_local |= item.is_local;
                track.into()
            }
            None => Self::Unavailable(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYLIST_PAGE: &str = r#"{
        "href": "https://api.spotify.com/v1/playlists/37i9dQZF1DXcBWIGoYBM5M/tracks?offset=0&limit=3",
        "items": [
            {
                "added_at": "2024-01-12T08:00:00Z",
                "is_local": false,
                "track": {
                    "id": "0VjIjW4GlUZAMYd2vXMi3b",
                    "uri": "spotify:track:0VjIjW4GlUZAMYd2vXMi3b",
                    "name": "Blinding Lights",
                    "artists": [{"id": "1Xyo4u8uXC1ZmMpatF05PJ", "name": "The Weeknd"}],
                    "album": {"id": "4yP0hdKOZPNshxUOjY0cZj", "name": "After Hours"},
                    "duration_ms": 200040,
                    "popularity": 92,
                    "is_playable": true,
                    "external_ids": {"isrc": "USUG11904206"}
                }
            },
            {
                "is_local": true,
                "track": {
                    "id": null,
                    "uri": "spotify:local:Artist:Album:Home+Demo:180",
                    "name": "Home Demo",
                    "artists": [{"id": null, "name": "Artist"}],
                    "album": {"id": null},
                    "duration_ms": 180000,
                    "is_local": true
                }
            },
            {
                "is_local": false,
                "track": null
            }
        ],
        "limit": 3,
        "offset": 0,
        "total": 57
    }"#;

    #[test]
    fn parses_playlist_page() {
        let page: Paging<PlaylistItem> = serde_json::from_str(PLAYLIST_PAGE).unwrap();
        assert_eq!(page.total, 57);
        assert_eq!(page.items.len(), 3);

        let items: Vec<ListingItem> = page.items.into_iter().map(Into::into).collect();
        let ListingItem::Track(descriptor) = &items[0] else {
            panic!("first item should be available");
        };
        assert_eq!(descriptor.id.as_str(), "0VjIjW4GlUZAMYd2vXMi3b");
        assert_eq!(descriptor.main_artist(), Some("The Weeknd"));
        assert_eq!(descriptor.album_id.as_deref(), Some("4yP0hdKOZPNshxUOjY0cZj"));
        assert_eq!(descriptor.duration, Some(Duration::from_millis(200_040)));
        assert_eq!(descriptor.isrc.as_deref(), Some("USUG11904206"));

        assert_eq!(
            items[1],
            ListingItem::Unavailable(Some(SourceId::new(
                "spotify:local:Artist:Album:Home+Demo:180"
            )))
        );
        assert_eq!(items[2], ListingItem::Unavailable(None));
    }

    #[test]
    fn unplayable_tracks_are_unavailable() {
        let track: Track = serde_json::from_str(
            r#"{
                "id": "3n3Ppam7vgaVa1iaRUc9Lp",
                "name": "Mr. Brightside",
                "artists": [{"id": "0C0XlULifJtAgn6ZNCW2eu", "name": "The Killers"}],
                "duration_ms": 222075,
                "is_playable": false
            }"#,
        )
        .unwrap();

        assert_eq!(
            ListingItem::from(track),
            ListingItem::Unavailable(Some(SourceId::new("3n3Ppam7vgaVa1iaRUc9Lp")))
        );
    }

    #[test]
    fn album_tracks_have_no_album_object() {
        let page: Paging<Track> = serde_json::from_str(
            r#"{
                "items": [{
                    "id": "2TpxZ7JUBn3uw46aR7qd6V",
                    "name": "All I Want",
                    "artists": [{"id": "1vCWHaC5f2uS3yhpwWbIA6", "name": "Kodaline"}],
                    "duration_ms": 305000
                }],
                "total": 1
            }"#,
        )
        .unwrap();

        let descriptor = page.items[0].clone().into_descriptor().unwrap();
        assert_eq!(descriptor.album_id, None);
        assert_eq!(descriptor.isrc, None);
        assert_eq!(descriptor.popularity, None);
    }

    #[test]
    fn missing_duration_keeps_the_page() {
        let page: Paging<PlaylistItem> = serde_json::from_str(
            r#"{
                "items": [
                    {"track": {"id": "a", "name": "Intro", "artists": [], "duration_ms": 0}},
                    {"track": {"id": "b", "name": "Outro", "artists": [{"id": null, "name": "Band"}]}}
                ],
                "total": 2
            }"#,
        )
        .unwrap();

        let descriptors: Vec<_> = page
            .items
            .into_iter()
            .filter_map(|item| ListingItem::from(item).into_descriptor())
            .collect();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].duration, None);
        assert_eq!(descriptors[1].duration, None);
        assert_eq!(descriptors[1].title, "Outro");
    }
}
