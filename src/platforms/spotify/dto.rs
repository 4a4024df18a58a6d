//! Spotify Web API Data Transfer Objects
//!
//! These types match what the Spotify Web API returns for the endpoints we
//! call. DO NOT use these types outside the spotify module - convert to
//! domain types in `adapter.rs`.
//!
//! API Reference: https://developer.spotify.com/documentation/web-api
//!
//! Example playlist items page:
//! ```json
//! {
//!   "items": [{
//!     "track": {
//!       "id": "3n3Ppam7vgaVa1iaRUc9Lp",
//!       "uri": "spotify:track:3n3Ppam7vgaVa1iaRUc9Lp",
//!       "name": "Mr. Brightside",
//!       "duration_ms": 222973,
//!       "artists": [{"id": "0C0XlULifJtAgn6ZNCW2eu", "name": "The Killers"}],
//!       "album": {"id": "4OHNH3sDzIxnmUADXzv2kT", "name": "Hot Fuss"}
//!     }
//!   }],
//!   "next": "https://api.spotify.com/v1/playlists/x/tracks?offset=100&limit=100",
//!   "total": 101
//! }
//! ```

use serde::{Deserialize, Serialize};

/// One page of any paginated Spotify collection
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Absolute URL of the next page
    pub next: Option<String>,
    #[serde(default)]
    pub total: u32,
}

/// Entry in a playlist; `track` is null for removed or local items
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<FullTrack>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FullTrack {
    /// Null for local files
    pub id: Option<String>,
    pub uri: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    pub album: Option<SimpleAlbum>,
    /// Only present when a market is supplied
    pub is_playable: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleAlbum {
    pub id: Option<String>,
    pub name: String,
}

/// `GET /search?type=track`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<Paging<FullTrack>>,
}

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Body of `POST /users/{id}/playlists`
#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
}

/// Playlist object returned from create / get
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistObject {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Body of `POST /playlists/{id}/tracks` (max 100 uris)
#[derive(Debug, Clone, Serialize)]
pub struct AddItemsRequest {
    pub uris: Vec<String>,
}

/// Body of `DELETE /playlists/{id}/tracks`
#[derive(Debug, Clone, Serialize)]
pub struct RemoveItemsRequest {
    pub tracks: Vec<UriRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UriRef {
    pub uri: String,
}

/// Mutations answer with the new snapshot id
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// ============================================================================
