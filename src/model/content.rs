//! Catalog data: playlists, tracks and recommendation items

use serde::{Deserialize, Serialize};

/// Image metadata attached to playlists and albums
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
}

impl PlaylistOwner {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Reference to a playlist's track listing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTracksRef {
    #[serde(default)]
    pub href: String,
    pub total: u32,
}

/// A playlist as returned by the listing endpoint.
///
/// Immutable for the session; a refetch replaces it wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub owner: PlaylistOwner,
    #[serde(default)]
    pub tracks: PlaylistTracksRef,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub uri: String,
}

impl Playlist {
    /// Case-insensitive substring match against name or description.
    /// `normalized_query` must already be trimmed and lowercased.
    pub fn matches(&self, normalized_query: &str) -> bool {
        if self.name.to_lowercase().contains(normalized_query) {
            return true;
        }
        self.description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(normalized_query))
    }
}

/// One page window of the playlist listing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistCollection {
    pub items: Vec<Playlist>,
    pub offset: u32,
    pub limit: u32,
    pub total: u32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl PlaylistCollection {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// A catalog track
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u32,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
}

impl Track {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }
}

/// The song an AI recommendation names
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub song_title: String,
    pub artist: String,
}

/// A recommendation plus whatever the backend resolved for it
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    #[serde(default)]
    pub success: bool,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub track: Option<Track>,
    #[serde(default)]
    pub preview_urls: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RecommendationItem {
    /// Deduplication identity, case-sensitive as received
    pub fn identity(&self) -> (&str, &str) {
        (&self.recommendation.song_title, &self.recommendation.artist)
    }

    pub fn has_preview(&self) -> bool {
        !self.preview_urls.is_empty()
    }

    pub fn title(&self) -> &str {
        if self.recommendation.song_title.is_empty() {
            "Unknown Song"
        } else {
            &self.recommendation.song_title
        }
    }

    /// Catalog artist if resolved, otherwise the recommended artist
    pub fn artist_name(&self) -> &str {
        if let Some(name) = self.track.as_ref().and_then(|t| t.primary_artist()) {
            return name;
        }
        if self.recommendation.artist.is_empty() {
            "Unknown Artist"
        } else {
            &self.recommendation.artist
        }
    }
}
