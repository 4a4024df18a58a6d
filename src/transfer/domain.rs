//! Internal domain models for transfer jobs.
//!
//! These types are OUR types - no platform wire format leaks in here.
//! Adapters convert their API responses into [`Track`]/[`Playlist`] and report
//! failures as [`TransferError`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Platform, Playlist, Track};

/// Errors that can occur while transferring a playlist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Transfer already running: {0}")]
    Conflict(String),

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Platform quota exceeded: {0}")]
    Quota(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Temporary failure: {0}")]
    Transient(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Invalid platform response: {0}")]
    InvalidResponse(String),
}

/// Category of a [`TransferError`], kept on job error descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    Auth,
    Quota,
    NotFound,
    Transient,
    Unsupported,
    InvalidResponse,
}

impl TransferError {
    /// Worth retrying: network trouble, timeouts, 5xx.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransferError::Transient(_))
    }

    /// Errors that end the job in whatever phase they surface.
    pub fn aborts_job(&self) -> bool {
        matches!(
            self,
            TransferError::Auth(_) | TransferError::Quota(_) | TransferError::Unsupported(_)
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Validation(_) => ErrorKind::Validation,
            TransferError::Conflict(_) => ErrorKind::Conflict,
            TransferError::Auth(_) => ErrorKind::Auth,
            TransferError::Quota(_) => ErrorKind::Quota,
            TransferError::NotFound(_) => ErrorKind::NotFound,
            TransferError::Transient(_) => ErrorKind::Transient,
            TransferError::Unsupported(_) => ErrorKind::Unsupported,
            TransferError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }
}

/// What to do when a track already exists in the destination playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    #[default]
    Skip,
    Replace,
    Ask,
}

impl FromStr for ConflictResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(ConflictResolution::Skip),
            "replace" => Ok(ConflictResolution::Replace),
            "ask" => Ok(ConflictResolution::Ask),
            other => Err(format!("unknown conflict resolution: {other}")),
        }
    }
}

/// Per-job knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferOptions {
    pub conflict_resolution: ConflictResolution,
    /// Tracks per `add_tracks` call
    pub batch_size: usize,
    /// Attempts per adapter call, see [`crate::transfer::RetryExecutor`]
    pub retry_attempts: u32,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictResolution::Skip,
            batch_size: 50,
            retry_attempts: 3,
        }
    }
}

/// Inbound request to move one playlist.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source_playlist: Playlist,
    pub source_platform: Platform,
    pub target_platform: Platform,
    pub options: TransferOptions,
}

impl TransferRequest {
    /// Request with default options, source platform taken from the playlist.
    pub fn new(source_playlist: Playlist, target_platform: Platform) -> Self {
        Self {
            source_platform: source_playlist.platform,
            source_playlist,
            target_platform,
            options: TransferOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Reject requests that can never run.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.source_platform == self.target_platform {
            return Err(TransferError::Validation(format!(
                "source and target platform are both {}",
                self.source_platform
            )));
        }
        if self.source_playlist.platform != self.source_platform {
            return Err(TransferError::Validation(format!(
                "playlist belongs to {}, not {}",
                self.source_playlist.platform, self.source_platform
            )));
        }
        let playlist = &self.source_playlist;
        if playlist.tracks.is_empty() && playlist.track_count == 0 {
            return Err(TransferError::Validation(format!(
                "playlist '{}' has no tracks",
                playlist.name
            )));
        }
        if !playlist.tracks.is_empty() && playlist.track_count != playlist.tracks.len() {
            return Err(TransferError::Validation(format!(
                "playlist '{}' reports {} tracks but carries {}",
                playlist.name,
                playlist.track_count,
                playlist.tracks.len()
            )));
        }
        let mut positions: Vec<u32> = playlist.tracks.iter().map(|t| t.position).collect();
        positions.sort_unstable();
        if let Some(pair) = positions.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(TransferError::Validation(format!(
                "playlist '{}' has two tracks at position {}",
                playlist.name, pair[0]
            )));
        }
        if self.options.batch_size == 0 {
            return Err(TransferError::Validation("batch size must be positive".into()));
        }
        Ok(())
    }
}

/// Externally visible job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

/// Internal phase of a running job, surfaced through progress only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    FetchingSource,
    Matching,
    CreatingPlaylist,
    InsertingTracks,
    Finalizing,
}

impl Phase {
    /// Progress band `(start, end)` in percent.
    pub fn band(&self) -> (u8, u8) {
        match self {
            Phase::FetchingSource => (0, 10),
            Phase::Matching => (10, 60),
            Phase::CreatingPlaylist => (60, 65),
            Phase::InsertingTracks => (65, 95),
            Phase::Finalizing => (95, 100),
        }
    }

    /// Progress after `done` of `total` units of this phase.
    pub fn scaled(&self, done: usize, total: usize) -> u8 {
        let (start, end) = self.band();
        if total == 0 {
            return end;
        }
        let span = (end - start) as usize;
        start + (span * done.min(total) / total) as u8
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::FetchingSource => "fetching source",
            Phase::Matching => "matching",
            Phase::CreatingPlaylist => "creating playlist",
            Phase::InsertingTracks => "inserting tracks",
            Phase::Finalizing => "finalizing",
        };
        f.write_str(label)
    }
}

/// Error descriptor recorded on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub phase: Phase,
    pub kind: ErrorKind,
    pub message: String,
    /// Source position of the affected track, if the error is per-track
    pub position: Option<u32>,
}

impl JobError {
    pub fn new(phase: Phase, error: &TransferError, position: Option<u32>) -> Self {
        Self {
            phase,
            kind: error.kind(),
            message: error.to_string(),
            position,
        }
    }
}

/// One execution of a source → target transfer.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub id: Uuid,
    pub source_playlist: Playlist,
    pub source_platform: Platform,
    pub target_platform: Platform,
    pub options: TransferOptions,
    pub state: JobState,
    /// Current phase while running, last phase reached afterwards
    pub phase: Option<Phase>,
    pub progress: u8,
    pub status_message: String,
    pub errors: Vec<JobError>,
    /// Source tracks that did not resolve on the target
    pub unmatched: Vec<Track>,
    pub target_playlist: Option<Playlist>,
    pub transferred_tracks: usize,
    pub total_tracks: usize,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TransferJob {
    pub fn new(request: TransferRequest) -> Self {
        let total_tracks = if request.source_playlist.tracks.is_empty() {
            request.source_playlist.track_count
        } else {
            request.source_playlist.tracks.len()
        };
        Self {
            id: Uuid::new_v4(),
            source_playlist: request.source_playlist,
            source_platform: request.source_platform,
            target_platform: request.target_platform,
            options: request.options,
            state: JobState::Idle,
            phase: None,
            progress: 0,
            status_message: String::new(),
            errors: Vec::new(),
            unmatched: Vec::new(),
            target_playlist: None,
            transferred_tracks: 0,
            total_tracks,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Outcome of resolving one source track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub original: Track,
    pub found: bool,
    /// The equivalent target track, present iff `found`
    pub matched: Option<Track>,
    /// Present iff the lookup itself failed
    pub error: Option<TransferError>,
}

impl MatchResult {
    pub fn found(original: Track, matched: Track) -> Self {
        Self {
            original,
            found: true,
            matched: Some(matched),
            error: None,
        }
    }

    pub fn not_found(original: Track) -> Self {
        Self {
            original,
            found: false,
            matched: None,
            error: None,
        }
    }

    pub fn failed(original: Track, error: TransferError) -> Self {
        Self {
            original,
            found: false,
            matched: None,
            error: Some(error),
        }
    }
}

/// How `add_tracks` treats tracks already in the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Insert new tracks, report existing ones as [`TrackOutcome::Duplicate`]
    Append,
    /// Remove existing copies and insert again. Platforms that append
    /// (Spotify) drop every earlier copy, so the track moves to the end.
    Replace,
}

/// Per-track answer from `add_tracks`, aligned with the submitted slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Added,
    Duplicate,
    UnavailableInRegion,
    Failed(String),
}

/// A duplicate awaiting a caller decision under [`ConflictResolution::Ask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackConflict {
    pub job_id: Uuid,
    pub playlist_id: String,
    /// Source position of the conflicting track
    pub position: u32,
    pub track: Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    Skip,
    Replace,
}

/// Progress notification pushed on every phase/item/batch transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub progress: u8,
    pub message: String,
    pub phase: Phase,
}

/// Final tallies of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub job_id: Uuid,
    pub target_playlist: Option<Playlist>,
    pub transferred_tracks: usize,
    pub total_tracks: usize,
    pub unmatched: usize,
    pub errors: Vec<JobError>,
}

/// Everything the engine tells its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Progress(ProgressEvent),
    ConflictPending(TrackConflict),
    Completed(TransferSummary),
    Failed {
        job_id: Uuid,
        phase: Phase,
        reason: String,
    },
    Cancelled {
        job_id: Uuid,
        progress: u8,
    },
}

impl TransferEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferEvent::Completed(_) | TransferEvent::Failed { .. } | TransferEvent::Cancelled { .. }
        )
    }
}

/// How a recorded job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOutcome {
    Completed,
    Failed,
    Cancelled,
}

impl From<JobState> for RecordOutcome {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Completed => RecordOutcome::Completed,
            JobState::Cancelled => RecordOutcome::Cancelled,
            _ => RecordOutcome::Failed,
        }
    }
}

/// Immutable history entry written when a job terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub job_id: Uuid,
    pub source_playlist: Playlist,
    pub source_platform: Platform,
    pub target_platform: Platform,
    pub target_playlist: Option<Playlist>,
    pub transferred_tracks: usize,
    pub total_tracks: usize,
    #[serde(default)]
    pub unmatched: Vec<Track>,
    pub outcome: RecordOutcome,
    pub timestamp: DateTime<Utc>,
}

impl TransferRecord {
    /// Snapshot a terminal job.
    pub fn from_job(job: &TransferJob) -> Self {
        Self {
            job_id: job.id,
            source_playlist: job.source_playlist.clone(),
            source_platform: job.source_platform,
            target_platform: job.target_platform,
            target_playlist: job.target_playlist.clone(),
            transferred_tracks: job.transferred_tracks,
            total_tracks: job.total_tracks,
            unmatched: job.unmatched.clone(),
            outcome: job.state.into(),
            timestamp: job.finished_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_playlist;

    #[test]
    fn test_error_classification() {
        assert!(TransferError::Transient("502".into()).is_transient());
        assert!(!TransferError::Auth("expired".into()).is_transient());
        assert!(TransferError::Auth("expired".into()).aborts_job());
        assert!(TransferError::Quota("daily".into()).aborts_job());
        assert!(TransferError::Unsupported("amazon".into()).aborts_job());
        assert!(!TransferError::NotFound("x".into()).aborts_job());
        assert!(!TransferError::Transient("x".into()).aborts_job());
    }

    #[test]
    fn test_default_options() {
        let options = TransferOptions::default();
        assert_eq!(options.conflict_resolution, ConflictResolution::Skip);
        assert_eq!(options.batch_size, 50);
        assert_eq!(options.retry_attempts, 3);
    }

    #[test]
    fn test_validate_same_platform() {
        let request = TransferRequest::new(mock_playlist(3), Platform::Spotify);
        assert!(matches!(request.validate(), Err(TransferError::Validation(_))));
    }

    #[test]
    fn test_validate_empty_playlist() {
        let request = TransferRequest::new(mock_playlist(0), Platform::YouTubeMusic);
        assert!(matches!(request.validate(), Err(TransferError::Validation(_))));
    }

    #[test]
    fn test_validate_count_mismatch() {
        let mut playlist = mock_playlist(2);
        playlist.track_count = 5;
        let request = TransferRequest::new(playlist, Platform::YouTubeMusic);
        assert!(matches!(request.validate(), Err(TransferError::Validation(_))));
    }

    #[test]
    fn test_validate_accepts_unfetched_snapshot() {
        let mut playlist = mock_playlist(0);
        playlist.track_count = 12;
        let request = TransferRequest::new(playlist, Platform::AppleMusic);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_positions() {
        let mut playlist = mock_playlist(3);
        playlist.tracks[2].position = 1;
        let request = TransferRequest::new(playlist, Platform::YouTubeMusic);
        assert!(matches!(request.validate(), Err(TransferError::Validation(_))));
    }

    #[test]
    fn test_phase_scaling() {
        assert_eq!(Phase::Matching.scaled(0, 4), 10);
        assert_eq!(Phase::Matching.scaled(2, 4), 35);
        assert_eq!(Phase::Matching.scaled(4, 4), 60);
        assert_eq!(Phase::InsertingTracks.scaled(1, 3), 75);
        assert_eq!(Phase::InsertingTracks.scaled(3, 3), 95);
        assert_eq!(Phase::InsertingTracks.scaled(0, 0), 95);
    }

    #[test]
    fn test_conflict_resolution_parse() {
        assert_eq!("ASK".parse(), Ok(ConflictResolution::Ask));
        assert!("merge".parse::<ConflictResolution>().is_err());
    }

    #[test]
    fn test_record_outcome_from_state() {
        assert_eq!(RecordOutcome::from(JobState::Completed), RecordOutcome::Completed);
        assert_eq!(RecordOutcome::from(JobState::Cancelled), RecordOutcome::Cancelled);
        assert_eq!(RecordOutcome::from(JobState::Failed), RecordOutcome::Failed);
    }
}
