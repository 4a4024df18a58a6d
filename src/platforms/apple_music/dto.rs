//! Apple Music API Data Transfer Objects
//!
//! Apple Music wraps everything in `{"data": [resource...]}` with resources of
//! the form `{"id", "type", "attributes": {...}}`.
//!
//! API Reference: https://developer.apple.com/documentation/applemusicapi
//!
//! Example library playlist tracks page:
//! ```json
//! {
//!   "next": "/v1/me/library/playlists/p.abc/tracks?offset=100",
//!   "data": [{
//!     "id": "i.4ZQbqpeHqq8pZ",
//!     "type": "library-songs",
//!     "attributes": {
//!       "name": "Mr. Brightside",
//!       "artistName": "The Killers",
//!       "albumName": "Hot Fuss",
//!       "durationInMillis": 222075,
//!       "playParams": {"id": "i.4ZQbqpeHqq8pZ", "kind": "song", "catalogId": "1440839627"}
//!     }
//!   }]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Generic `{"data": [...], "next": ...}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Path (not URL) of the next page
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Song {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Option<SongAttributes>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongAttributes {
    pub name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub album_name: String,
    pub duration_in_millis: Option<u64>,
    pub play_params: Option<PlayParams>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayParams {
    pub id: String,
    pub kind: String,
    /// Catalog id for library songs that exist in the catalog
    pub catalog_id: Option<String>,
}

/// `GET /v1/catalog/{storefront}/search?types=songs`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub results: SearchResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    pub songs: Option<ResourceList<Song>>,
}

/// Body of `POST /v1/me/library/playlists`
#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistRequest {
    pub attributes: NewPlaylistAttributes,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPlaylistAttributes {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryPlaylist {
    pub id: String,
    pub attributes: Option<LibraryPlaylistAttributes>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryPlaylistAttributes {
    pub name: String,
    pub description: Option<Description>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub standard: String,
}

/// Body of `POST /v1/me/library/playlists/{id}/tracks`
#[derive(Debug, Clone, Serialize)]
pub struct AddTracksRequest {
    pub data: Vec<TrackReference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackReference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

// ============================================================================
// CONTRACT TESTS
// ============================================================================
