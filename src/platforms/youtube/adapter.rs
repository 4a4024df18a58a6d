//! Adapter layer: YouTube DTOs ↔ domain models, plus the [`PlatformAdapter`]
//! implementation built on [`YouTubeClient`].
//!
//! YouTube has no structured artist/title metadata for most uploads. We use
//! the "Artist - Title" convention when the title follows it, and otherwise
//! fall back to the channel name (minus " - Topic" / "VEVO").

use async_trait::async_trait;

use super::client::YouTubeClient;
use super::dto;
use crate::model::{Platform, Playlist, Track};
use crate::platforms::http::InsertLedger;
use crate::platforms::pick_best;
use crate::transfer::domain::{InsertMode, TrackOutcome, TransferError};
use crate::transfer::traits::PlatformAdapter;

const SEARCH_LIMIT: u32 = 5;

/// Split a video title into (track name, artists).
pub fn split_title(title: &str, channel: &str) -> (String, Vec<String>) {
    if let Some((artist, name)) = title.split_once(" - ") {
        let artist = artist.trim();
        let name = name.trim();
        if !artist.is_empty() && !name.is_empty() {
            return (name.to_string(), vec![artist.to_string()]);
        }
    }
    let channel = channel_artist(channel);
    let artists = if channel.is_empty() { Vec::new() } else { vec![channel] };
    (title.trim().to_string(), artists)
}

/// "Adele - Topic" → "Adele", "AdeleVEVO" → "Adele".
fn channel_artist(channel: &str) -> String {
    let channel = channel.trim();
    let channel = channel.strip_suffix(" - Topic").unwrap_or(channel);
    let channel = channel.strip_suffix("VEVO").unwrap_or(channel);
    channel.trim().to_string()
}

/// Playlist entries → ordered tracks. Deleted and private videos (no owner
/// channel) are dropped.
pub fn to_tracks(items: Vec<dto::PlaylistItem>) -> Vec<Track> {
    let mut items: Vec<_> = items
        .into_iter()
        .filter(|item| item.snippet.resource_id.video_id.is_some())
        .filter(|item| item.snippet.video_owner_channel_title.is_some())
        .collect();
    items.sort_by_key(|item| item.snippet.position.unwrap_or(u32::MAX));

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let snippet = item.snippet;
            let channel = snippet.video_owner_channel_title.unwrap_or_default();
            let (name, artists) = split_title(&snippet.title, &channel);
            let mut track = Track::new(name, artists, index as u32 + 1, Platform::YouTubeMusic);
            track.external_id = snippet.resource_id.video_id;
            track
        })
        .collect()
}

pub fn to_candidate(result: dto::SearchResult, position: u32) -> Option<Track> {
    let video_id = result.id.video_id?;
    let (name, artists) = split_title(&result.snippet.title, &result.snippet.channel_title);
    let mut track = Track::new(name, artists, position, Platform::YouTubeMusic);
    track.external_id = Some(video_id);
    Some(track)
}

pub fn to_playlist(resource: dto::PlaylistResource) -> Playlist {
    let mut playlist = Playlist::new(resource.id, resource.snippet.title, Platform::YouTubeMusic);
    playlist.description = resource.snippet.description;
    playlist.url = format!("https://music.youtube.com/playlist?list={}", playlist.id);
    playlist
}

pub fn search_query(track: &Track) -> String {
    match track.primary_artist() {
        Some(artist) => format!("{} {}", artist, track.name),
        None => track.name.clone(),
    }
}

/// YouTube Music implementation of the transfer capability set.
pub struct YouTubeAdapter {
    client: YouTubeClient,
    ledger: InsertLedger,
}

impl YouTubeAdapter {
    pub fn new(client: YouTubeClient) -> Self {
        Self {
            client,
            ledger: InsertLedger::new(),
        }
    }
}

#[async_trait]
impl PlatformAdapter for YouTubeAdapter {
    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, TransferError> {
        let items = self.client.playlist_items(playlist_id).await?;
        Ok(to_tracks(items))
    }

    async fn search_track(&self, track: &Track) -> Result<Option<Track>, TransferError> {
        let results = match self.client.search_videos(&search_query(track), SEARCH_LIMIT).await {
            Ok(results) => results,
            Err(TransferError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let candidates = results
            .into_iter()
            .filter_map(|result| to_candidate(result, track.position))
            .collect();
        Ok(pick_best(track, candidates))
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist, TransferError> {
        let body = dto::PlaylistInsert {
            snippet: dto::PlaylistSnippet {
                title: name.to_string(),
                description: description.to_string(),
            },
            status: dto::PlaylistStatus {
                privacy_status: "private".to_string(),
            },
        };
        let created = self.client.insert_playlist(&body).await?;
        tracing::info!(playlist_id = %created.id, "Created YouTube playlist '{}'", created.snippet.title);
        Ok(to_playlist(created))
    }

    /// One insert per track. A transient failure before anything was inserted
    /// fails the batch so it can be retried whole. After that, a failed insert
    /// marks only its own track as failed and the rest of the batch goes on.
    async fn add_tracks(
        &self,
        playlist_id: &str,
        tracks: &[Track],
        mode: InsertMode,
    ) -> Result<Vec<TrackOutcome>, TransferError> {
        let ids: Vec<Option<String>> = tracks.iter().map(|t| t.external_id.clone()).collect();
        let mut plan = self.ledger.plan(playlist_id, &ids, mode);

        for (index, entry) in &plan.remove {
            if let Some(entry_id) = entry {
                self.client.delete_item(entry_id).await?;
            }
            if let Some(video_id) = &ids[*index] {
                self.ledger.forget(playlist_id, video_id);
            }
        }

        let mut inserted = 0;
        for index in plan.send.clone() {
            let Some(video_id) = ids[index].as_deref() else {
                continue;
            };
            match self.client.insert_item(playlist_id, video_id).await {
                Ok(entry) => {
                    self.ledger.record(playlist_id, video_id, Some(entry.id));
                    inserted += 1;
                }
                Err(e) if e.aborts_job() => return Err(e),
                Err(e) if e.is_transient() && inserted == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(playlist_id, video_id, "Insert failed: {}", e);
                    plan.outcomes[index] = TrackOutcome::Failed(e.to_string());
                }
            }
        }

        Ok(plan.outcomes)
    }
}
