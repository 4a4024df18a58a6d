//! Amazon Music.
//!
//! Amazon offers no public playlist API, so every operation reports
//! [`TransferError::Unsupported`]. The engine fails such jobs immediately
//! instead of retrying.

use async_trait::async_trait;

use crate::model::{Platform, Playlist, Track};
use crate::transfer::domain::{InsertMode, TrackOutcome, TransferError};
use crate::transfer::traits::PlatformAdapter;

#[derive(Debug, Default)]
pub struct AmazonMusicAdapter;

impl AmazonMusicAdapter {
    pub fn new() -> Self {
        Self
    }

    fn unsupported(operation: &str) -> TransferError {
        TransferError::Unsupported(format!(
            "{} does not support {}",
            Platform::AmazonMusic.display_name(),
            operation
        ))
    }
}

#[async_trait]
impl PlatformAdapter for AmazonMusicAdapter {
    async fn fetch_tracks(&self, _playlist_id: &str) -> Result<Vec<Track>, TransferError> {
        Err(Self::unsupported("reading playlists"))
    }

    async fn search_track(&self, _track: &Track) -> Result<Option<Track>, TransferError> {
        Err(Self::unsupported("catalog search"))
    }

    async fn create_playlist(&self, _name: &str, _description: &str) -> Result<Playlist, TransferError> {
        Err(Self::unsupported("creating playlists"))
    }

    async fn add_tracks(
        &self,
        _playlist_id: &str,
        _tracks: &[Track],
        _mode: InsertMode,
    ) -> Result<Vec<TrackOutcome>, TransferError> {
        Err(Self::unsupported("adding tracks"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_track;

    #[tokio::test]
    async fn test_every_operation_is_unsupported() {
        let adapter = AmazonMusicAdapter::new();

        let errors = vec![
            adapter.fetch_tracks("p").await.unwrap_err(),
            adapter.search_track(&mock_track(1)).await.unwrap_err(),
            adapter.create_playlist("n", "d").await.unwrap_err(),
            adapter.add_tracks("p", &[], InsertMode::Append).await.unwrap_err(),
        ];

        for error in errors {
            assert!(matches!(error, TransferError::Unsupported(_)));
            assert!(!error.is_transient());
            assert!(error.aborts_job());
        }
    }
}
