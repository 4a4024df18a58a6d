//! Test utilities and fixtures for playlist-porter tests.
//!
//! This module provides common test helpers, mock factories, and
//! history store utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use playlist_porter::test_utils::{temp_history, mock_playlist};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (history, _dir) = temp_history().await;
//!     let playlist = mock_playlist(3);
//!     // ... test logic
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use crate::model::{Platform, Playlist, Track};
use crate::transfer::domain::{RecordOutcome, TransferRecord};
use crate::transfer::history::SqliteHistory;
use crate::transfer::link::{AdapterRegistry, PlatformLink};
use crate::transfer::rate_limit::RateLimiter;
use crate::transfer::retry::RetryExecutor;
use crate::transfer::traits::PlatformAdapter;
use crate::transfer::traits::mocks::MockAdapter;

/// Creates a temporary SQLite history store.
///
/// The database lives in a temporary directory that is removed when the
/// returned `TempDir` is dropped. Migrations run on open.
///
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_history() -> (SqliteHistory, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let url = SqliteHistory::url_for(&dir.path().join("history.db"));

    let history = SqliteHistory::open(&url)
        .await
        .expect("Failed to open test history");

    (history, dir)
}

/// Creates a Spotify track at `position` with sensible defaults.
///
/// Customize using struct update syntax:
///
/// ```ignore
/// let track = Track {
///     name: "Custom".to_string(),
///     ..mock_track(1)
/// };
/// ```
pub fn mock_track(position: u32) -> Track {
    Track {
        name: format!("Track {}", position),
        artists: vec!["Test Artist".to_string()],
        album: "Test Album".to_string(),
        duration: Some("3:00".to_string()),
        position,
        platform: Platform::Spotify,
        external_id: Some(format!("spotify-track-{}", position)),
    }
}

/// Spotify playlist snapshot with tracks at positions `1..=count`.
pub fn mock_playlist(count: usize) -> Playlist {
    let tracks = (1..=count as u32).map(mock_track).collect();
    Playlist::new("source-playlist", "Road Trip", Platform::Spotify).with_tracks(tracks)
}

/// Wraps an adapter with a generous limiter and millisecond retry backoff.
pub fn mock_link(platform: Platform, adapter: Arc<dyn PlatformAdapter>) -> PlatformLink {
    PlatformLink::new(
        platform,
        adapter,
        RateLimiter::per_second(1000),
        RetryExecutor::new(Duration::from_millis(1)),
    )
}

/// Registry holding one source and one target mock.
pub fn mock_registry(source: Arc<MockAdapter>, target: Arc<MockAdapter>) -> AdapterRegistry {
    AdapterRegistry::new()
        .with(mock_link(source.platform, source))
        .with(mock_link(target.platform, target))
}

/// A completed Spotify → YouTube Music record with `transferred` tracks moved.
pub fn mock_record(transferred: usize) -> TransferRecord {
    TransferRecord {
        job_id: Uuid::new_v4(),
        source_playlist: mock_playlist(2),
        source_platform: Platform::Spotify,
        target_platform: Platform::YouTubeMusic,
        target_playlist: Some(Playlist::new(
            "target-playlist",
            "Road Trip",
            Platform::YouTubeMusic,
        )),
        transferred_tracks: transferred,
        total_tracks: transferred.max(2),
        unmatched: Vec::new(),
        outcome: RecordOutcome::Completed,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::history::HistoryStore;

    #[tokio::test]
    async fn test_temp_history_starts_empty() {
        let (history, _dir) = temp_history().await;

        let records = history.list().await.unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_mock_playlist_is_consistent() {
        let playlist = mock_playlist(4);
        assert_eq!(playlist.track_count, 4);
        assert_eq!(playlist.tracks.len(), 4);
        let positions: Vec<u32> = playlist.tracks.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert!(playlist.tracks.iter().all(|t| t.platform == Platform::Spotify));
    }

    #[test]
    fn test_mock_track_defaults() {
        let track = mock_track(7);
        assert_eq!(track.name, "Track 7");
        assert_eq!(track.primary_artist(), Some("Test Artist"));
        assert_eq!(track.duration_secs(), Some(180));
    }

    #[test]
    fn test_mock_registry_has_both_platforms() {
        let registry = mock_registry(
            Arc::new(MockAdapter::new(Platform::Spotify)),
            Arc::new(MockAdapter::new(Platform::AppleMusic)),
        );
        assert_eq!(registry.platforms(), vec![Platform::Spotify, Platform::AppleMusic]);
    }
}
