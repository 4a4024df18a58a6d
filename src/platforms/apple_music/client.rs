//! Apple Music API HTTP client
//!
//! Every request carries two tokens: the developer token (`Authorization:
//! Bearer`) and the user's Music User Token (`Music-User-Token`). The
//! credential's access token is the user token.
//!
//! ## API Notes
//!
//! - Pagination `next` links are paths relative to the API host.
//! - Catalog search is scoped to a storefront (`us`, `gb`, ...).
//! - The API can append to library playlists but not remove from them.

use serde::de::DeserializeOwned;

use super::dto;
use crate::model::{Credential, Platform};
use crate::platforms::http::{classify_transport, ensure_fresh, expect_success, read_json};
use crate::transfer::domain::TransferError;

const PLATFORM: Platform = Platform::AppleMusic;

/// Apple Music API client
pub struct AppleMusicClient {
    developer_token: String,
    credential: Credential,
    storefront: String,
    http_client: reqwest::Client,
    base_url: String,
}

impl AppleMusicClient {
    pub fn new(developer_token: impl Into<String>, credential: Credential, storefront: impl Into<String>) -> reqwest::Result<Self> {
        Self::with_base_url(developer_token, credential, storefront, "https://api.music.apple.com")
    }

    pub fn with_base_url(
        developer_token: impl Into<String>,
        credential: Credential,
        storefront: impl Into<String>,
        base_url: impl Into<String>,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            developer_token: developer_token.into(),
            credential,
            storefront: storefront.into(),
            http_client: crate::platforms::http::http_client()?,
            base_url: base_url.into(),
        })
    }

    /// Every song of a library playlist, following `next` paths.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<dto::Song>, TransferError> {
        let mut next = Some(format!(
            "/v1/me/library/playlists/{}/tracks?limit=100",
            urlencoding::encode(playlist_id)
        ));
        let mut songs = Vec::new();

        while let Some(path) = next.take() {
            let page: dto::ResourceList<dto::Song> = self.get(&path).await?;
            songs.extend(page.data);
            next = page.next;
        }
        Ok(songs)
    }

    pub async fn search_songs(&self, term: &str, limit: u32) -> Result<Vec<dto::Song>, TransferError> {
        let path = format!(
            "/v1/catalog/{}/search?types=songs&limit={}&term={}",
            urlencoding::encode(&self.storefront),
            limit,
            urlencoding::encode(term)
        );
        let response: dto::SearchResponse = self.get(&path).await?;
        Ok(response.results.songs.map(|songs| songs.data).unwrap_or_default())
    }

    pub async fn create_playlist(
        &self,
        request: &dto::CreatePlaylistRequest,
    ) -> Result<dto::LibraryPlaylist, TransferError> {
        let response = self
            .authorized(self.http_client.post(format!("{}/v1/me/library/playlists", self.base_url)))?
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport(PLATFORM, e))?;
        let created: dto::ResourceList<dto::LibraryPlaylist> = read_json(PLATFORM, response).await?;
        created
            .data
            .into_iter()
            .next()
            .ok_or_else(|| TransferError::InvalidResponse("Apple Music created no playlist".into()))
    }

    /// Append songs to a library playlist. Answers 204 with no body.
    pub async fn add_tracks(&self, playlist_id: &str, songs: Vec<dto::TrackReference>) -> Result<(), TransferError> {
        let body = dto::AddTracksRequest { data: songs };
        let url = format!(
            "{}/v1/me/library/playlists/{}/tracks",
            self.base_url,
            urlencoding::encode(playlist_id)
        );
        let response = self
            .authorized(self.http_client.post(url))?
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(PLATFORM, e))?;
        expect_success(PLATFORM, response).await?;
        Ok(())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, TransferError> {
        ensure_fresh(PLATFORM, &self.credential)?;
        if self.developer_token.is_empty() {
            return Err(TransferError::Auth("Apple Music developer token is missing".into()));
        }
        Ok(request
            .bearer_auth(&self.developer_token)
            .header("Music-User-Token", &self.credential.access_token))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransferError> {
        let response = self
            .authorized(self.http_client.get(format!("{}{}", self.base_url, path)))?
            .send()
            .await
            .map_err(|e| classify_transport(PLATFORM, e))?;
        read_json(PLATFORM, response).await
    }
}
