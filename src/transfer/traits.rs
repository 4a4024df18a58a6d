//! Trait definitions at the engine's seams.
//!
//! [`PlatformAdapter`] is the only thing the engine knows about a music
//! service. Production code plugs in the HTTP adapters from
//! [`crate::platforms`], tests substitute the scripted mocks below.
//!
//! # Example
//!
//! ```ignore
//! use playlist_porter::transfer::traits::PlatformAdapter;
//!
//! async fn count<A: PlatformAdapter>(adapter: &A, id: &str) -> usize {
//!     adapter.fetch_tracks(id).await.map(|t| t.len()).unwrap_or(0)
//! }
//! ```

use async_trait::async_trait;

use super::domain::{ConflictDecision, InsertMode, TrackConflict, TrackOutcome, TransferError};
use crate::model::{Playlist, Track};

/// The four-operation capability set every platform implements.
///
/// Implementations own their credential, wire format and pagination. They
/// must classify failures into the [`TransferError`] taxonomy; the engine
/// never looks past it.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// All tracks of a playlist, in playlist order with 1-based positions.
    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, TransferError>;

    /// Best equivalent of `track` on this platform. `Ok(None)` means the
    /// search worked and found nothing.
    async fn search_track(&self, track: &Track) -> Result<Option<Track>, TransferError>;

    /// Create an empty playlist owned by the credential's user.
    async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist, TransferError>;

    /// Insert `tracks` in order. Returns one outcome per submitted track;
    /// per-track rejections are outcomes, never errors.
    async fn add_tracks(
        &self,
        playlist_id: &str,
        tracks: &[Track],
        mode: InsertMode,
    ) -> Result<Vec<TrackOutcome>, TransferError>;
}

/// Caller-supplied answer source for [`super::ConflictResolution::Ask`].
///
/// The engine suspends the job on `decide` until the caller answers.
#[async_trait]
pub trait ConflictDecider: Send + Sync {
    async fn decide(&self, conflict: &TrackConflict) -> ConflictDecision;
}
