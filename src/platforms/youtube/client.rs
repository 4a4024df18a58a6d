//! YouTube Data API v3 HTTP client
//!
//! ## API Quirks
//!
//! ### Quota errors are 403s
//! Exhausted daily quota comes back as `403` with reason `quotaExceeded`
//! (or `rateLimitExceeded`), not as `429`. We read the error body before
//! classifying so these surface as `Quota` rather than `Auth`.
//!
//! ### One insert per video
//! `playlistItems.insert` takes a single video; batches are sent one request
//! per track. Each insert costs 50 quota units.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::dto;
use crate::model::{Credential, Platform};
use crate::platforms::http::{classify_status, classify_transport, ensure_fresh, expect_success, read_json};
use crate::transfer::domain::TransferError;

const PLATFORM: Platform = Platform::YouTubeMusic;

/// Error reasons that mean "out of quota", whatever the status says.
const QUOTA_REASONS: [&str; 3] = ["quotaExceeded", "rateLimitExceeded", "dailyLimitExceeded"];

/// YouTube Data API client
pub struct YouTubeClient {
    credential: Credential,
    api_key: Option<String>,
    http_client: reqwest::Client,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(credential: Credential, api_key: Option<String>) -> reqwest::Result<Self> {
        Self::with_base_url(credential, api_key, "https://www.googleapis.com/youtube/v3")
    }

    pub fn with_base_url(
        credential: Credential,
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            credential,
            api_key,
            http_client: crate::platforms::http::http_client()?,
            base_url: base_url.into(),
        })
    }

    /// All entries of a playlist, following `nextPageToken`.
    pub async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<dto::PlaylistItem>, TransferError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "snippet".to_string()),
                ("maxResults", "50".to_string()),
                ("playlistId", playlist_id.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let page: dto::PlaylistItemListResponse = self
                .send(self.http_client.get(format!("{}/playlistItems", self.base_url)).query(&query))
                .await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(items)
    }

    /// Music-category video search.
    pub async fn search_videos(&self, query: &str, limit: u32) -> Result<Vec<dto::SearchResult>, TransferError> {
        let limit = limit.to_string();
        let request = self.http_client.get(format!("{}/search", self.base_url)).query(&[
            ("part", "snippet"),
            ("type", "video"),
            ("videoCategoryId", "10"),
            ("maxResults", limit.as_str()),
            ("q", query),
        ]);
        let response: dto::SearchListResponse = self.send(request).await?;
        Ok(response.items)
    }

    pub async fn insert_playlist(&self, body: &dto::PlaylistInsert) -> Result<dto::PlaylistResource, TransferError> {
        let request = self
            .http_client
            .post(format!("{}/playlists", self.base_url))
            .query(&[("part", "snippet,status")])
            .json(body);
        self.send(request).await
    }

    pub async fn insert_item(&self, playlist_id: &str, video_id: &str) -> Result<dto::InsertedPlaylistItem, TransferError> {
        let body = dto::PlaylistItemInsert {
            snippet: dto::PlaylistItemInsertSnippet {
                playlist_id: playlist_id.to_string(),
                resource_id: dto::ResourceId {
                    kind: "youtube#video".to_string(),
                    video_id: Some(video_id.to_string()),
                },
            },
        };
        let request = self
            .http_client
            .post(format!("{}/playlistItems", self.base_url))
            .query(&[("part", "snippet")])
            .json(&body);
        self.send(request).await
    }

    pub async fn delete_item(&self, entry_id: &str) -> Result<(), TransferError> {
        let request = self
            .http_client
            .delete(format!("{}/playlistItems", self.base_url))
            .query(&[("id", entry_id)]);
        let response = self.dispatch(request).await?;
        expect_success(PLATFORM, response).await?;
        Ok(())
    }

    async fn dispatch(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, TransferError> {
        ensure_fresh(PLATFORM, &self.credential)?;
        let request = match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        };
        let response = request
            .bearer_auth(&self.credential.access_token)
            .send()
            .await
            .map_err(|e| classify_transport(PLATFORM, e))?;

        if response.status() != StatusCode::FORBIDDEN {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if let Ok(error) = serde_json::from_str::<dto::ErrorResponse>(&body)
            && error.error.errors.iter().any(|e| QUOTA_REASONS.contains(&e.reason.as_str()))
        {
            return Err(TransferError::Quota(format!("YouTube quota exhausted: {}", error.error.message)));
        }
        Err(classify_status(PLATFORM, StatusCode::FORBIDDEN, None, &body))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, TransferError> {
        let response = self.dispatch(request).await?;
        read_json(PLATFORM, response).await
    }
}
