//! YouTube Data API v3 Data Transfer Objects
//!
//! Shapes of the `playlistItems`, `search` and `playlists` resources as the
//! API returns them (camelCase). Convert to domain types in `adapter.rs`.
//!
//! API Reference: https://developers.google.com/youtube/v3/docs
//!
//! Example `playlistItems.list` response:
//! ```json
//! {
//!   "nextPageToken": "EAAaBlBUOkNBVQ",
//!   "items": [{
//!     "id": "UExhYmNkZWY...",
//!     "snippet": {
//!       "title": "The Killers - Mr. Brightside",
//!       "position": 0,
//!       "videoOwnerChannelTitle": "The Killers - Topic",
//!       "resourceId": {"kind": "youtube#video", "videoId": "gGdGFtwCNBE"}
//!     }
//!   }],
//!   "pageInfo": {"totalResults": 42, "resultsPerPage": 50}
//! }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    /// Playlist entry id, needed to delete this entry
    pub id: String,
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    pub title: String,
    /// Zero-based position in the playlist
    pub position: Option<u32>,
    /// Absent for deleted/private videos
    pub video_owner_channel_title: Option<String>,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: String,
    pub video_id: Option<String>,
}

/// `search.list?type=video`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
    pub snippet: SearchSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    pub kind: String,
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
}

/// Body of `playlists.insert`
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistInsert {
    pub snippet: PlaylistSnippet,
    pub status: PlaylistStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStatus {
    pub privacy_status: String,
}

/// Playlist resource returned by `playlists.insert`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistResource {
    pub id: String,
    pub snippet: PlaylistSnippet,
}

/// Body of `playlistItems.insert`
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistItemInsert {
    pub snippet: PlaylistItemInsertSnippet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemInsertSnippet {
    pub playlist_id: String,
    pub resource_id: ResourceId,
}

/// Resource returned by `playlistItems.insert`
#[derive(Debug, Clone, Deserialize)]
pub struct InsertedPlaylistItem {
    pub id: String,
}

/// Error envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub reason: String,
}

// ============================================================================
// CONTRACT TESTS
// ============================================================================
