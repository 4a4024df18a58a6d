//! Adapter layer: Apple Music DTOs ↔ domain models, plus the
//! [`PlatformAdapter`] implementation built on [`AppleMusicClient`].

use async_trait::async_trait;

use super::client::AppleMusicClient;
use super::dto;
use crate::model::{Platform, Playlist, Track};
use crate::platforms::http::InsertLedger;
use crate::platforms::{format_duration, pick_best};
use crate::transfer::domain::{InsertMode, TrackOutcome, TransferError};
use crate::transfer::traits::PlatformAdapter;

const SEARCH_LIMIT: u32 = 5;

/// Library playlists accept at most this many songs per request.
const MAX_ITEMS_PER_REQUEST: usize = 100;

/// Convert a song resource. Library songs are identified by their catalog id
/// when they have one, so the same song compares equal across sources.
pub fn to_track(song: dto::Song, position: u32) -> Option<Track> {
    let attributes = song.attributes?;
    let catalog_id = attributes.play_params.and_then(|p| p.catalog_id);
    Some(Track {
        name: attributes.name,
        artists: split_artists(&attributes.artist_name),
        album: attributes.album_name,
        duration: attributes.duration_in_millis.map(format_duration),
        position,
        platform: Platform::AppleMusic,
        external_id: Some(catalog_id.unwrap_or(song.id)),
    })
}

/// "A & B" and "A, B & C" carry several artists in one string.
fn split_artists(artist_name: &str) -> Vec<String> {
    artist_name
        .split([',', '&'])
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

pub fn to_tracks(songs: Vec<dto::Song>) -> Vec<Track> {
    songs
        .into_iter()
        .filter(|song| song.attributes.is_some())
        .enumerate()
        .filter_map(|(index, song)| to_track(song, index as u32 + 1))
        .collect()
}

pub fn to_playlist(playlist: dto::LibraryPlaylist) -> Playlist {
    let (name, description) = match playlist.attributes {
        Some(attributes) => (
            attributes.name,
            attributes.description.map(|d| d.standard).unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    let mut converted = Playlist::new(playlist.id, name, Platform::AppleMusic);
    converted.description = description;
    converted
}

pub fn search_term(track: &Track) -> String {
    match track.primary_artist() {
        Some(artist) => format!("{} {}", artist, track.name),
        None => track.name.clone(),
    }
}

/// Library ids (`i.…`) must be sent as library songs.
fn to_reference(id: &str) -> dto::TrackReference {
    let kind = if id.starts_with("i.") { "library-songs" } else { "songs" };
    dto::TrackReference {
        id: id.to_string(),
        kind: kind.to_string(),
    }
}

/// Apple Music implementation of the transfer capability set.
///
/// The API cannot remove tracks from a playlist, so [`InsertMode::Replace`]
/// appends the track again.
pub struct AppleMusicAdapter {
    client: AppleMusicClient,
    ledger: InsertLedger,
}

impl AppleMusicAdapter {
    pub fn new(client: AppleMusicClient) -> Self {
        Self {
            client,
            ledger: InsertLedger::new(),
        }
    }
}

#[async_trait]
impl PlatformAdapter for AppleMusicAdapter {
    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, TransferError> {
        let songs = self.client.playlist_tracks(playlist_id).await?;
        Ok(to_tracks(songs))
    }

    async fn search_track(&self, track: &Track) -> Result<Option<Track>, TransferError> {
        let songs = self.client.search_songs(&search_term(track), SEARCH_LIMIT).await?;
        let candidates = songs
            .into_iter()
            .filter_map(|song| to_track(song, track.position))
            .collect();
        Ok(pick_best(track, candidates))
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist, TransferError> {
        let request = dto::CreatePlaylistRequest {
            attributes: dto::NewPlaylistAttributes {
                name: name.to_string(),
                description: description.to_string(),
            },
        };
        let created = to_playlist(self.client.create_playlist(&request).await?);
        tracing::info!(playlist_id = %created.id, "Created Apple Music playlist '{}'", name);
        Ok(created)
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        tracks: &[Track],
        mode: InsertMode,
    ) -> Result<Vec<TrackOutcome>, TransferError> {
        let ids: Vec<Option<String>> = tracks.iter().map(|t| t.external_id.clone()).collect();
        let plan = self.ledger.plan(playlist_id, &ids, mode);
        if !plan.remove.is_empty() {
            tracing::debug!(playlist_id, count = plan.remove.len(), "Apple Music cannot remove tracks, appending again");
        }

        for chunk in plan.send.chunks(MAX_ITEMS_PER_REQUEST) {
            let songs = chunk
                .iter()
                .filter_map(|index| ids[*index].as_deref().map(to_reference))
                .collect();
            self.client.add_tracks(playlist_id, songs).await?;
            for index in chunk {
                if let Some(id) = &ids[*index] {
                    self.ledger.record(playlist_id, id, None);
                }
            }
        }

        Ok(plan.outcomes)
    }
}
