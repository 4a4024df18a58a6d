//! Spotify Web API HTTP client
//!
//! Thin wrapper over the endpoints the adapter needs. Returns DTOs; the
//! adapter converts them.
//!
//! ## API Notes
//!
//! - Playlist items are paged 100 at a time; `next` is an absolute URL.
//! - Adding items accepts at most 100 uris per request.
//! - `market=from_token` makes search results playable for the token's country.

use super::dto;
use crate::model::{Credential, Platform};
use crate::platforms::http::{classify_transport, ensure_fresh, expect_success, read_json};
use crate::transfer::domain::TransferError;

const PLATFORM: Platform = Platform::Spotify;

/// Spotify accepts at most this many uris per add/remove request.
pub const MAX_ITEMS_PER_REQUEST: usize = 100;

/// Spotify Web API client
pub struct SpotifyClient {
    credential: Credential,
    http_client: reqwest::Client,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(credential: Credential) -> reqwest::Result<Self> {
        Self::with_base_url(credential, "https://api.spotify.com/v1")
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(credential: Credential, base_url: impl Into<String>) -> reqwest::Result<Self> {
        Ok(Self {
            credential,
            http_client: crate::platforms::http::http_client()?,
            base_url: base_url.into(),
        })
    }

    /// Every item of a playlist, following `next` links.
    pub async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<dto::PlaylistItem>, TransferError> {
        let mut url = format!(
            "{}/playlists/{}/tracks?limit=100",
            self.base_url,
            urlencoding::encode(playlist_id)
        );
        let mut items = Vec::new();

        loop {
            let page: dto::Paging<dto::PlaylistItem> = self.get(&url).await?;
            tracing::debug!(playlist_id, fetched = items.len() + page.items.len(), total = page.total, "Spotify page");
            items.extend(page.items);
            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(items)
    }

    /// Track search; an empty result is `Ok(vec![])`.
    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<dto::FullTrack>, TransferError> {
        let url = format!(
            "{}/search?type=track&market=from_token&limit={}&q={}",
            self.base_url,
            limit,
            urlencoding::encode(query)
        );
        let response: dto::SearchResponse = self.get(&url).await?;
        Ok(response.tracks.map(|page| page.items).unwrap_or_default())
    }

    pub async fn current_user(&self) -> Result<dto::CurrentUser, TransferError> {
        self.get(&format!("{}/me", self.base_url)).await
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        request: &dto::CreatePlaylistRequest,
    ) -> Result<dto::PlaylistObject, TransferError> {
        ensure_fresh(PLATFORM, &self.credential)?;
        let url = format!("{}/users/{}/playlists", self.base_url, urlencoding::encode(user_id));
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.credential.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport(PLATFORM, e))?;
        read_json(PLATFORM, response).await
    }

    /// Append up to [`MAX_ITEMS_PER_REQUEST`] uris.
    pub async fn add_items(&self, playlist_id: &str, uris: Vec<String>) -> Result<dto::SnapshotResponse, TransferError> {
        ensure_fresh(PLATFORM, &self.credential)?;
        let url = self.items_url(playlist_id);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.credential.access_token)
            .json(&dto::AddItemsRequest { uris })
            .send()
            .await
            .map_err(|e| classify_transport(PLATFORM, e))?;
        read_json(PLATFORM, response).await
    }

    /// Remove every occurrence of the given uris.
    pub async fn remove_items(&self, playlist_id: &str, uris: Vec<String>) -> Result<(), TransferError> {
        ensure_fresh(PLATFORM, &self.credential)?;
        let body = dto::RemoveItemsRequest {
            tracks: uris.into_iter().map(|uri| dto::UriRef { uri }).collect(),
        };
        let response = self
            .http_client
            .delete(self.items_url(playlist_id))
            .bearer_auth(&self.credential.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(PLATFORM, e))?;
        expect_success(PLATFORM, response).await?;
        Ok(())
    }

    fn items_url(&self, playlist_id: &str) -> String {
        format!("{}/playlists/{}/tracks", self.base_url, urlencoding::encode(playlist_id))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, TransferError> {
        ensure_fresh(PLATFORM, &self.credential)?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.credential.access_token)
            .send()
            .await
            .map_err(|e| classify_transport(PLATFORM, e))?;
        read_json(PLATFORM, response).await
    }
}
