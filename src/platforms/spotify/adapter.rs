//! Adapter layer: Spotify DTOs ↔ domain models, plus the [`PlatformAdapter`]
//! implementation built on [`SpotifyClient`].
//!
//! This is the ONLY place where Spotify DTO types are converted to domain types.

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::client::{MAX_ITEMS_PER_REQUEST, SpotifyClient};
use super::dto;
use crate::model::{Platform, Playlist, Track};
use crate::platforms::http::InsertLedger;
use crate::platforms::{format_duration, pick_best};
use crate::transfer::domain::{InsertMode, TrackOutcome, TransferError};
use crate::transfer::traits::PlatformAdapter;

/// How many search hits to weigh per track.
const SEARCH_LIMIT: u32 = 5;

/// Convert a Spotify track to a domain track at `position`.
pub fn to_track(track: dto::FullTrack, position: u32) -> Track {
    Track {
        name: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: track.album.map(|a| a.name).unwrap_or_default(),
        duration: (track.duration_ms > 0).then(|| format_duration(track.duration_ms)),
        position,
        platform: Platform::Spotify,
        external_id: track.id,
    }
}

/// Playlist items → ordered tracks. Local files and removed tracks have no
/// Spotify id and can't be transferred, so they are dropped.
pub fn to_tracks(items: Vec<dto::PlaylistItem>) -> Vec<Track> {
    items
        .into_iter()
        .filter(|item| !item.is_local)
        .filter_map(|item| item.track.filter(|t| t.id.is_some()))
        .enumerate()
        .map(|(index, track)| to_track(track, index as u32 + 1))
        .collect()
}

pub fn to_playlist(playlist: dto::PlaylistObject) -> Playlist {
    let mut converted = Playlist::new(playlist.id, playlist.name, Platform::Spotify);
    converted.description = playlist.description.unwrap_or_default();
    converted.url = playlist.external_urls.spotify.unwrap_or_default();
    converted
}

/// Field-filtered search query.
pub fn search_query(track: &Track) -> String {
    match track.primary_artist() {
        Some(artist) => format!("track:{} artist:{}", track.name, artist),
        None => format!("track:{}", track.name),
    }
}

fn track_uri(id: &str) -> String {
    format!("spotify:track:{id}")
}

/// Spotify implementation of the transfer capability set.
pub struct SpotifyAdapter {
    client: SpotifyClient,
    ledger: InsertLedger,
    user_id: OnceCell<String>,
}

impl SpotifyAdapter {
    pub fn new(client: SpotifyClient) -> Self {
        Self {
            client,
            ledger: InsertLedger::new(),
            user_id: OnceCell::new(),
        }
    }

    async fn user_id(&self) -> Result<&str, TransferError> {
        self.user_id
            .get_or_try_init(|| async { self.client.current_user().await.map(|user| user.id) })
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl PlatformAdapter for SpotifyAdapter {
    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, TransferError> {
        let items = self.client.playlist_items(playlist_id).await?;
        let fetched = items.len();
        let tracks = to_tracks(items);
        if tracks.len() < fetched {
            tracing::info!(playlist_id, skipped = fetched - tracks.len(), "Skipped local or unavailable Spotify items");
        }
        Ok(tracks)
    }

    async fn search_track(&self, track: &Track) -> Result<Option<Track>, TransferError> {
        let hits = match self.client.search_tracks(&search_query(track), SEARCH_LIMIT).await {
            Ok(hits) => hits,
            Err(TransferError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let candidates = hits
            .into_iter()
            .filter(|hit| hit.is_playable != Some(false) && hit.id.is_some())
            .map(|hit| to_track(hit, track.position))
            .collect();
        Ok(pick_best(track, candidates))
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist, TransferError> {
        let user_id = self.user_id().await?;
        let request = dto::CreatePlaylistRequest {
            name: name.to_string(),
            description: description.to_string(),
            public: false,
        };
        let created = self.client.create_playlist(user_id, &request).await?;
        tracing::info!(playlist_id = %created.id, "Created Spotify playlist '{}'", created.name);
        Ok(to_playlist(created))
    }

    /// Up to 100 tracks per request. A transient failure before any request
    /// succeeded fails the batch so it can be retried whole; once tracks have
    /// gone in, a failed request marks only its own tracks as failed.
    ///
    /// Replace removes every occurrence of the track first, so the re-added
    /// copy lands at the end of the playlist.
    async fn add_tracks(
        &self,
        playlist_id: &str,
        tracks: &[Track],
        mode: InsertMode,
    ) -> Result<Vec<TrackOutcome>, TransferError> {
        let ids: Vec<Option<String>> = tracks.iter().map(|t| t.external_id.clone()).collect();
        let mut plan = self.ledger.plan(playlist_id, &ids, mode);

        if !plan.remove.is_empty() {
            let uris = plan
                .remove
                .iter()
                .filter_map(|(index, _)| ids[*index].as_deref().map(track_uri))
                .collect();
            self.client.remove_items(playlist_id, uris).await?;
            for (index, _) in &plan.remove {
                if let Some(id) = &ids[*index] {
                    self.ledger.forget(playlist_id, id);
                }
            }
        }

        let mut sent = 0;
        for chunk in plan.send.chunks(MAX_ITEMS_PER_REQUEST) {
            let uris = chunk
                .iter()
                .filter_map(|index| ids[*index].as_deref().map(track_uri))
                .collect();
            match self.client.add_items(playlist_id, uris).await {
                Ok(_) => {
                    for index in chunk {
                        if let Some(id) = &ids[*index] {
                            self.ledger.record(playlist_id, id, None);
                        }
                    }
                    sent += chunk.len();
                }
                Err(e) if e.aborts_job() => return Err(e),
                Err(e) if e.is_transient() && sent == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(playlist_id, tracks = chunk.len(), "Add request failed: {}", e);
                    for index in chunk {
                        plan.outcomes[*index] = TrackOutcome::Failed(e.to_string());
                    }
                }
            }
        }

        Ok(plan.outcomes)
    }
}
