//! Track records shared by the source catalog, the playback catalog and the
//! queue.
//!
//! * [`SourceDescriptor`] - what the source catalog knows about a track
//! * [`CandidateMetadata`] - one search result from the playback catalog
//! * [`PlayableItem`] - a candidate that was accepted for a descriptor
//!
//! All of them are immutable once constructed. A `PlayableItem` can only be
//! obtained from a candidate together with the descriptor it resolves, so an
//! item always knows where it came from.

use std::{borrow::Borrow, fmt, sync::Arc, time::Duration};

use url::Url;

/// Stable identifier of a track on the source catalog.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(String);

impl SourceId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for SourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of a playable item on the playback catalog.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogId(String);

impl CatalogId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatalogId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CatalogId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An artist credit on the source catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
}

impl Artist {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// Metadata identifying a track on the source catalog.
///
/// Identity is the [`SourceId`]: two descriptors with the same ID are the
/// same track, whatever their other fields say.
#[derive(Clone, Debug)]
pub struct SourceDescriptor {
    pub id: SourceId,
    pub title: String,

    /// Credited artists, main artist first.
    pub artists: Vec<Artist>,

    pub album_id: Option<String>,
    pub duration: Option<Duration>,

    /// Popularity (0-100) or listing order, whichever the source provides.
    pub popularity: Option<u32>,

    /// International Standard Recording Code, enabling direct lookups.
    pub isrc: Option<String>,
}

impl SourceDescriptor {
    #[must_use]
    pub fn new(id: impl Into<SourceId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: Vec::new(),
            album_id: None,
            duration: None,
            popularity: None,
            isrc: None,
        }
    }

    #[must_use]
    pub fn with_artist(mut self, name: impl Into<String>) -> Self {
        self.artists.push(Artist::named(name));
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn with_isrc(mut self, isrc: impl Into<String>) -> Self {
        self.isrc = Some(isrc.into());
        self
    }

    /// The main artist, if any is credited.
    #[must_use]
    pub fn main_artist(&self) -> Option<&str> {
        self.artists
            .first()
            .map(|artist| artist.name.as_str())
            .filter(|name| !name.trim().is_empty())
    }

    /// All credited artist names joined for display and matching.
    #[must_use]
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PartialEq for SourceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SourceDescriptor {}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.main_artist() {
            Some(_) => write!(f, "{} - {} [{}]", self.artist_names(), self.title, self.id),
            None => write!(f, "{} [{}]", self.title, self.id),
        }
    }
}

/// A search result from the playback catalog, in one canonical shape.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateMetadata {
    pub id: CatalogId,
    pub title: String,
    pub artists: Vec<String>,
    pub duration: Option<Duration>,
    pub artwork: Option<Url>,
}

impl CandidateMetadata {
    #[must_use]
    pub fn new(id: impl Into<CatalogId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: Vec::new(),
            duration: None,
            artwork: None,
        }
    }

    #[must_use]
    pub fn with_artist(mut self, name: impl Into<String>) -> Self {
        self.artists.push(name.into());
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn artist_names(&self) -> String {
        self.artists.join(", ")
    }

    /// Accepts this candidate as the playable item for `source`.
    #[must_use]
    pub fn into_playable(self, source: Arc<SourceDescriptor>) -> PlayableItem {
        PlayableItem {
            artist: self.artist_names(),
            id: self.id,
            title: self.title,
            duration: self.duration,
            artwork: self.artwork,
            source,
        }
    }
}

/// A track that the playback engine can play.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayableItem {
    id: CatalogId,
    title: String,
    artist: String,
    duration: Option<Duration>,
    artwork: Option<Url>,
    source: Arc<SourceDescriptor>,
}

impl PlayableItem {
    #[must_use]
    pub fn id(&self) -> &CatalogId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn artist(&self) -> &str {
        &self.artist
    }

    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    #[must_use]
    pub fn artwork(&self) -> Option<&Url> {
        self.artwork.as_ref()
    }

    /// The descriptor this item was resolved from.
    #[must_use]
    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    #[must_use]
    pub fn source_id(&self) -> &SourceId {
        &self.source.id
    }
}

impl fmt::Display for PlayableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} [{}]", self.artist, self.title, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_identity_is_source_id() {
        let a = SourceDescriptor::new("4uLU6hMCjMI75M1A2tKUQC", "Never Gonna Give You Up");
        let b = SourceDescriptor::new("4uLU6hMCjMI75M1A2tKUQC", "Never Gonna Give You Up (Remastered)")
            .with_artist("Rick Astley");
        assert_eq!(a, b);
    }

    #[test]
    fn main_artist_skips_blank_credit() {
        let descriptor = SourceDescriptor::new("1", "Untitled").with_artist("  ");
        assert_eq!(descriptor.main_artist(), None);

        let descriptor = SourceDescriptor::new("1", "Around the World")
            .with_artist("Daft Punk")
            .with_artist("Romanthony");
        assert_eq!(descriptor.main_artist(), Some("Daft Punk"));
        assert_eq!(descriptor.artist_names(), "Daft Punk, Romanthony");
    }

    #[test]
    fn playable_item_keeps_back_reference() {
        let source = Arc::new(SourceDescriptor::new("src-1", "Harder Better Faster Stronger"));
        let item = CandidateMetadata::new("dQw4w9WgXcQ", "Harder, Better, Faster, Stronger")
            .with_artist("Daft Punk")
            .with_duration(Duration::from_secs(224))
            .into_playable(Arc::clone(&source));

        assert_eq!(item.source_id().as_str(), "src-1");
        assert_eq!(item.artist(), "Daft Punk");
        assert_eq!(item.id().as_str(), "dQw4w9WgXcQ");
        assert_eq!(item.duration(), Some(Duration::from_secs(224)));
    }
}
