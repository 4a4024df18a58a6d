//! Transfer engine - drives one playlist transfer at a time.
//!
//! A job moves through these phases, reported via progress events only:
//! 1. Fetching source tracks (0-10%)
//! 2. Matching each track on the target platform (10-60%)
//! 3. Creating the destination playlist (60-65%)
//! 4. Inserting matched tracks in batches (65-95%)
//! 5. Finalizing and writing history (95-100%)
//!
//! At most one job is Running per [`Engine`] (clones share the slot).
//! [`Engine::start_transfer`] returns as soon as the job is accepted; the
//! phases run on a spawned task. Cancellation is cooperative: the flag is
//! checked before each phase, each track and each batch, and once it is set
//! the job's progress no longer moves. Once the job has started writing its
//! history record it can no longer be cancelled.
//!
//! # Usage
//!
//! ```ignore
//! let (tx, mut events) = event_channel();
//! let engine = Engine::new(registry, history).with_event_sender(tx);
//! let job_id = engine.start_transfer(TransferRequest::new(playlist, Platform::YouTubeMusic))?;
//! while let Some(event) = events.next().await {
//!     if event.is_terminal() { break; }
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::stream::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::domain::{
    ConflictDecision, ConflictResolution, InsertMode, JobError, JobState, Phase, ProgressEvent,
    TrackConflict, TrackOutcome, TransferError, TransferEvent, TransferJob, TransferRecord,
    TransferRequest, TransferSummary,
};
use super::history::HistoryStore;
use super::link::{AdapterRegistry, PlatformLink};
use super::matcher::MatchResolver;
use super::traits::ConflictDecider;
use crate::model::{Playlist, Track};

/// Create an event channel whose receiving end is a `Stream`.
pub fn event_channel() -> (
    mpsc::UnboundedSender<TransferEvent>,
    impl Stream<Item = TransferEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    });
    (tx, stream)
}

/// The single job slot shared by all clones of an engine.
#[derive(Default)]
struct Slot {
    job: Option<TransferJob>,
    cancel: Arc<AtomicBool>,
    /// Past the last cancellation checkpoint
    finishing: bool,
}

/// Orchestrates playlist transfers.
#[derive(Clone)]
pub struct Engine {
    registry: Arc<AdapterRegistry>,
    resolver: MatchResolver,
    history: Arc<dyn HistoryStore>,
    decider: Option<Arc<dyn ConflictDecider>>,
    events: Option<mpsc::UnboundedSender<TransferEvent>>,
    slot: Arc<Mutex<Slot>>,
}

impl Engine {
    pub fn new(registry: AdapterRegistry, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            registry: Arc::new(registry),
            resolver: MatchResolver::default(),
            history,
            decider: None,
            events: None,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Use a custom match strategy.
    pub fn with_resolver(mut self, resolver: MatchResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Register the decision source required by [`ConflictResolution::Ask`].
    pub fn with_decider(mut self, decider: Arc<dyn ConflictDecider>) -> Self {
        self.decider = Some(decider);
        self
    }

    /// Send progress and terminal events to `tx`.
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<TransferEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Accept a transfer and start it in the background.
    ///
    /// Fails fast with [`TransferError::Conflict`] while another job is
    /// Running, and with [`TransferError::Validation`] for requests that can
    /// never succeed. Must be called from within a Tokio runtime.
    pub fn start_transfer(&self, request: TransferRequest) -> Result<Uuid, TransferError> {
        let mut slot = self.slot.lock();

        if let Some(current) = slot.job.as_ref()
            && current.state == JobState::Running
        {
            return Err(TransferError::Conflict(format!(
                "job {} is still transferring '{}'",
                current.id, current.source_playlist.name
            )));
        }

        request.validate()?;
        if request.options.conflict_resolution == ConflictResolution::Ask && self.decider.is_none() {
            return Err(TransferError::Validation(
                "conflict resolution 'ask' needs a decision handler".into(),
            ));
        }
        let source = self.registry.require(request.source_platform)?.clone();
        let target = self.registry.require(request.target_platform)?.clone();

        let mut job = TransferJob::new(request);
        job.state = JobState::Running;
        job.phase = Some(Phase::FetchingSource);
        job.status_message = "Starting transfer".to_string();
        let job_id = job.id;

        let cancel = Arc::new(AtomicBool::new(false));
        let runner = JobRunner {
            engine: self.clone(),
            job_id,
            cancel: Arc::clone(&cancel),
            source,
            target,
            playlist: job.source_playlist.clone(),
            options: job.options.clone(),
        };

        tracing::info!(
            job_id = %job_id,
            source = %job.source_platform,
            target = %job.target_platform,
            "Accepted transfer of '{}'",
            job.source_playlist.name
        );

        slot.job = Some(job);
        slot.cancel = cancel;
        slot.finishing = false;
        drop(slot);

        tokio::spawn(runner.run());
        Ok(job_id)
    }

    /// Ask the running job to stop at its next checkpoint.
    ///
    /// Returns `false` (and does nothing) when no job is running, or when the
    /// running job is already finalizing.
    pub fn cancel_transfer(&self) -> bool {
        let slot = self.slot.lock();
        match slot.job.as_ref() {
            Some(job) if job.state == JobState::Running && !slot.finishing => {
                slot.cancel.store(true, Ordering::SeqCst);
                tracing::info!(job_id = %job.id, progress = job.progress, "Cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Snapshot of the current (or most recent) job.
    pub fn status(&self) -> Option<TransferJob> {
        self.slot.lock().job.clone()
    }

    pub fn is_running(&self) -> bool {
        self.slot
            .lock()
            .job
            .as_ref()
            .is_some_and(|job| job.state == JobState::Running)
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is watching
            let _ = tx.send(event);
        }
    }
}

/// How the phases ended.
enum Ending {
    Completed,
    Cancelled,
    Failed { phase: Phase, error: TransferError },
}

/// Executes one job's phases; owns nothing the engine needs afterwards.
struct JobRunner {
    engine: Engine,
    job_id: Uuid,
    cancel: Arc<AtomicBool>,
    source: PlatformLink,
    target: PlatformLink,
    playlist: Playlist,
    options: super::domain::TransferOptions,
}

impl JobRunner {
    async fn run(self) {
        let ending = self.execute().await;
        self.finish(ending).await;
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Apply `f` to this runner's job in the engine slot.
    fn with_job<R>(&self, f: impl FnOnce(&mut TransferJob) -> R) -> Option<R> {
        let mut slot = self.engine.slot.lock();
        slot.job.as_mut().filter(|job| job.id == self.job_id).map(f)
    }

    /// Move progress forward and notify. Once cancellation is requested the
    /// job's progress is frozen and no further progress is reported.
    fn report(&self, phase: Phase, progress: u8, message: impl Into<String>) {
        let message = message.into();
        {
            let mut slot = self.engine.slot.lock();
            if slot.cancel.load(Ordering::SeqCst) {
                return;
            }
            let Some(job) = slot.job.as_mut().filter(|job| job.id == self.job_id) else {
                return;
            };
            job.phase = Some(phase);
            job.progress = job.progress.max(progress);
            job.status_message = message.clone();
        }
        tracing::debug!(job_id = %self.job_id, %phase, progress, "{}", message);
        self.engine.emit(TransferEvent::Progress(ProgressEvent {
            job_id: self.job_id,
            progress,
            message,
            phase,
        }));
    }

    fn record_error(&self, error: JobError) {
        tracing::warn!(
            job_id = %self.job_id,
            phase = %error.phase,
            position = ?error.position,
            "{}",
            error.message
        );
        self.with_job(|job| job.errors.push(error));
    }

    async fn execute(&self) -> Ending {
        let attempts = self.options.retry_attempts;

        // Phase 1: source tracks
        if self.cancelled() {
            return Ending::Cancelled;
        }
        self.report(
            Phase::FetchingSource,
            0,
            format!("Reading '{}' from {}", self.playlist.name, self.source.platform.display_name()),
        );
        let mut tracks = if self.playlist.tracks.is_empty() {
            let playlist_id = self.playlist.id.clone();
            let fetched = self
                .source
                .call(attempts, |adapter| {
                    let playlist_id = playlist_id.clone();
                    async move { adapter.fetch_tracks(&playlist_id).await }
                })
                .await;
            match fetched {
                Ok(tracks) if tracks.is_empty() => {
                    return Ending::Failed {
                        phase: Phase::FetchingSource,
                        error: TransferError::NotFound(format!(
                            "playlist '{}' has no tracks on {}",
                            self.playlist.name, self.source.platform
                        )),
                    };
                }
                Ok(tracks) => tracks,
                Err(error) => {
                    return Ending::Failed {
                        phase: Phase::FetchingSource,
                        error,
                    };
                }
            }
        } else {
            self.playlist.tracks.clone()
        };
        tracks.sort_by_key(|track| track.position);

        let total = tracks.len();
        self.with_job(|job| {
            job.total_tracks = total;
            if job.source_playlist.tracks.is_empty() {
                job.source_playlist.tracks = tracks.clone();
                job.source_playlist.track_count = total;
            }
        });
        self.report(Phase::FetchingSource, 10, format!("Found {total} tracks"));

        // Phase 2: matching
        if self.cancelled() {
            return Ending::Cancelled;
        }
        self.report(
            Phase::Matching,
            10,
            format!("Searching {} for {total} tracks", self.target.platform.display_name()),
        );
        let mut matched: Vec<Track> = Vec::with_capacity(total);
        for (index, track) in tracks.iter().enumerate() {
            if self.cancelled() {
                return Ending::Cancelled;
            }

            let result = self.engine.resolver.resolve(track, &self.target, attempts).await;
            if let Some(matched_track) = result.matched {
                matched.push(matched_track);
            } else {
                if let Some(error) = result.error {
                    if error.aborts_job() {
                        return Ending::Failed {
                            phase: Phase::Matching,
                            error,
                        };
                    }
                    self.record_error(JobError::new(Phase::Matching, &error, Some(track.position)));
                }
                self.with_job(|job| job.unmatched.push(result.original));
            }

            self.report(
                Phase::Matching,
                Phase::Matching.scaled(index + 1, total),
                format!("Matched {}/{}: {}", index + 1, total, track.name),
            );
        }
        tracing::info!(
            job_id = %self.job_id,
            matched = matched.len(),
            total,
            "Matching finished"
        );

        // Phase 3: destination playlist
        if self.cancelled() {
            return Ending::Cancelled;
        }
        self.report(
            Phase::CreatingPlaylist,
            60,
            format!("Creating playlist on {}", self.target.platform.display_name()),
        );
        let description = if self.playlist.description.is_empty() {
            format!("Transferred from {}", self.source.platform.display_name())
        } else {
            self.playlist.description.clone()
        };
        let name = self.playlist.name.clone();
        let created = self
            .target
            .call(attempts, |adapter| {
                let name = name.clone();
                let description = description.clone();
                async move { adapter.create_playlist(&name, &description).await }
            })
            .await;
        let target_playlist = match created {
            Ok(playlist) => playlist,
            Err(error) => {
                return Ending::Failed {
                    phase: Phase::CreatingPlaylist,
                    error,
                };
            }
        };
        self.with_job(|job| job.target_playlist = Some(target_playlist.clone()));
        self.report(
            Phase::CreatingPlaylist,
            65,
            format!("Created playlist '{}'", target_playlist.name),
        );

        // Phase 4: insertion
        if self.cancelled() {
            return Ending::Cancelled;
        }
        let batches = partition(&matched, self.options.batch_size);
        self.report(
            Phase::InsertingTracks,
            65,
            format!("Adding {} tracks in {} batches", matched.len(), batches.len()),
        );
        for (index, batch) in batches.iter().enumerate() {
            if self.cancelled() {
                return Ending::Cancelled;
            }

            match self.insert_batch(&target_playlist.id, batch).await {
                Ok(added) => {
                    self.with_job(|job| job.transferred_tracks += added);
                }
                Err(error) if error.aborts_job() => {
                    return Ending::Failed {
                        phase: Phase::InsertingTracks,
                        error,
                    };
                }
                Err(error) => {
                    let first = batch.first().map(|t| t.position);
                    self.record_error(JobError::new(Phase::InsertingTracks, &error, first));
                }
            }

            self.report(
                Phase::InsertingTracks,
                Phase::InsertingTracks.scaled(index + 1, batches.len()),
                format!("Added batch {}/{}", index + 1, batches.len()),
            );
        }

        // Phase 5
        if self.cancelled() {
            return Ending::Cancelled;
        }
        self.report(Phase::Finalizing, 95, "Saving transfer history");
        Ending::Completed
    }

    /// Insert one batch, then settle duplicates per the conflict policy.
    /// Returns how many tracks ended up in the playlist.
    async fn insert_batch(&self, playlist_id: &str, batch: &[Track]) -> Result<usize, TransferError> {
        let outcomes = self.add(playlist_id, batch, InsertMode::Append).await?;

        let mut added = 0;
        let mut duplicates = Vec::new();
        for (track, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                TrackOutcome::Added => added += 1,
                TrackOutcome::Duplicate => duplicates.push(track.clone()),
                other => self.record_rejection(track, &other),
            }
        }

        if duplicates.is_empty() {
            return Ok(added);
        }

        let replacements = match self.options.conflict_resolution {
            ConflictResolution::Skip => {
                tracing::debug!(job_id = %self.job_id, count = duplicates.len(), "Skipping duplicates");
                Vec::new()
            }
            ConflictResolution::Replace => duplicates,
            ConflictResolution::Ask => self.ask_about(playlist_id, duplicates).await,
        };
        if replacements.is_empty() {
            return Ok(added);
        }

        match self.add(playlist_id, &replacements, InsertMode::Replace).await {
            Ok(outcomes) => {
                for (track, outcome) in replacements.iter().zip(outcomes) {
                    match outcome {
                        TrackOutcome::Added => added += 1,
                        other => self.record_rejection(track, &other),
                    }
                }
                Ok(added)
            }
            Err(error) if error.aborts_job() => Err(error),
            Err(error) => {
                let first = replacements.first().map(|t| t.position);
                self.record_error(JobError::new(Phase::InsertingTracks, &error, first));
                Ok(added)
            }
        }
    }

    async fn add(
        &self,
        playlist_id: &str,
        tracks: &[Track],
        mode: InsertMode,
    ) -> Result<Vec<TrackOutcome>, TransferError> {
        let outcomes = self
            .target
            .call(self.options.retry_attempts, |adapter| {
                let playlist_id = playlist_id.to_string();
                let tracks = tracks.to_vec();
                async move { adapter.add_tracks(&playlist_id, &tracks, mode).await }
            })
            .await?;

        if outcomes.len() != tracks.len() {
            return Err(TransferError::InvalidResponse(format!(
                "{} answered {} outcomes for {} tracks",
                self.target.platform,
                outcomes.len(),
                tracks.len()
            )));
        }
        Ok(outcomes)
    }

    async fn ask_about(&self, playlist_id: &str, duplicates: Vec<Track>) -> Vec<Track> {
        let Some(decider) = self.engine.decider.clone() else {
            return Vec::new();
        };
        let mut replacements = Vec::new();
        for track in duplicates {
            let conflict = TrackConflict {
                job_id: self.job_id,
                playlist_id: playlist_id.to_string(),
                position: track.position,
                track: track.clone(),
            };
            self.engine.emit(TransferEvent::ConflictPending(conflict.clone()));
            if decider.decide(&conflict).await == ConflictDecision::Replace {
                replacements.push(track);
            }
        }
        replacements
    }

    fn record_rejection(&self, track: &Track, outcome: &TrackOutcome) {
        let error = match outcome {
            TrackOutcome::UnavailableInRegion => {
                TransferError::NotFound(format!("'{}' is not available in this region", track.name))
            }
            TrackOutcome::Failed(reason) => TransferError::Transient(format!("'{}': {}", track.name, reason)),
            TrackOutcome::Duplicate => {
                TransferError::Validation(format!("'{}' is already in the playlist", track.name))
            }
            TrackOutcome::Added => return,
        };
        self.record_error(JobError::new(Phase::InsertingTracks, &error, Some(track.position)));
    }

    /// Close the job to cancellation. A cancel accepted after the last
    /// checkpoint still turns a completed run into a cancelled one.
    fn seal(&self, ending: Ending) -> Option<(TransferJob, Ending)> {
        let mut slot = self.engine.slot.lock();
        let cancelled = slot.cancel.load(Ordering::SeqCst);
        let job = slot.job.as_ref().filter(|job| job.id == self.job_id)?.clone();
        slot.finishing = true;
        let ending = match ending {
            Ending::Completed if cancelled => Ending::Cancelled,
            other => other,
        };
        Some((job, ending))
    }

    /// Write history, then publish the terminal state and event.
    async fn finish(&self, ending: Ending) {
        let Some((mut job, ending)) = self.seal(ending) else {
            return;
        };

        job.finished_at = Some(Utc::now());
        match &ending {
            Ending::Completed => {
                job.state = JobState::Completed;
                job.phase = Some(Phase::Finalizing);
                job.progress = 100;
                job.status_message = format!(
                    "Transferred {} of {} tracks",
                    job.transferred_tracks, job.total_tracks
                );
            }
            Ending::Cancelled => {
                job.state = JobState::Cancelled;
                job.status_message = "Transfer cancelled".to_string();
            }
            Ending::Failed { phase, error } => {
                job.state = JobState::Failed;
                job.phase = Some(*phase);
                job.status_message = format!("Failed while {phase}: {error}");
                job.errors.push(JobError::new(*phase, error, None));
            }
        }

        if let Err(e) = self.engine.history.append(&TransferRecord::from_job(&job)).await {
            tracing::error!(job_id = %job.id, "Failed to record transfer history: {}", e);
        }

        match &ending {
            Ending::Completed => tracing::info!(
                job_id = %job.id,
                transferred = job.transferred_tracks,
                total = job.total_tracks,
                errors = job.errors.len(),
                "Transfer completed"
            ),
            Ending::Cancelled => tracing::info!(job_id = %job.id, progress = job.progress, "Transfer cancelled"),
            Ending::Failed { phase, error } => {
                tracing::error!(job_id = %job.id, %phase, "Transfer failed: {}", error)
            }
        }

        let progress = job.progress;
        let summary = TransferSummary {
            job_id: job.id,
            target_playlist: job.target_playlist.clone(),
            transferred_tracks: job.transferred_tracks,
            total_tracks: job.total_tracks,
            unmatched: job.unmatched.len(),
            errors: job.errors.clone(),
        };
        self.with_job(|slot_job| *slot_job = job);
        if matches!(ending, Ending::Completed) {
            self.engine.emit(TransferEvent::Progress(ProgressEvent {
                job_id: self.job_id,
                progress: 100,
                message: summary_message(&summary),
                phase: Phase::Finalizing,
            }));
        }

        self.engine.emit(match ending {
            Ending::Completed => TransferEvent::Completed(summary),
            Ending::Cancelled => TransferEvent::Cancelled {
                job_id: self.job_id,
                progress,
            },
            Ending::Failed { phase, error } => TransferEvent::Failed {
                job_id: self.job_id,
                phase,
                reason: error.to_string(),
            },
        });
    }
}

/// Split matched tracks into insert batches of at most `batch_size`,
/// preserving order.
fn partition(tracks: &[Track], batch_size: usize) -> Vec<&[Track]> {
    tracks.chunks(batch_size.max(1)).collect()
}

fn summary_message(summary: &TransferSummary) -> String {
    if summary.unmatched == 0 && summary.errors.is_empty() {
        format!("Transferred all {} tracks", summary.total_tracks)
    } else {
        format!(
            "Transferred {} of {} tracks ({} not found)",
            summary.transferred_tracks, summary.total_tracks, summary.unmatched
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::StreamExt;

    use crate::model::Platform;
    use crate::test_utils::{mock_playlist, mock_registry, mock_track};
    use crate::transfer::domain::{ErrorKind, RecordOutcome, TransferOptions};
    use crate::transfer::history::MemoryHistory;
    use crate::transfer::traits::mocks::{AdapterCall, MockAdapter, RecordingDecider};

    struct Harness {
        engine: Engine,
        history: Arc<MemoryHistory>,
        source: Arc<MockAdapter>,
        target: Arc<MockAdapter>,
        events: mpsc::UnboundedReceiver<TransferEvent>,
    }

    fn harness(source: MockAdapter, target: MockAdapter) -> Harness {
        let source = Arc::new(source);
        let target = Arc::new(target);
        let history = Arc::new(MemoryHistory::new());
        let (tx, events) = mpsc::unbounded_channel();
        let engine = Engine::new(mock_registry(source.clone(), target.clone()), history.clone())
            .with_event_sender(tx);
        Harness {
            engine,
            history,
            source,
            target,
            events,
        }
    }

    fn default_harness() -> Harness {
        harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic),
        )
    }

    fn request(tracks: usize, options: TransferOptions) -> TransferRequest {
        TransferRequest::new(mock_playlist(tracks), Platform::YouTubeMusic).with_options(options)
    }

    /// Collect events up to and including the terminal one.
    async fn drain(events: &mut mpsc::UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
                .await
                .expect("timed out waiting for transfer events")
                .expect("event channel closed");
            let terminal = event.is_terminal();
            seen.push(event);
            if terminal {
                return seen;
            }
        }
    }

    /// Wait until a progress event satisfies `pred`, returning everything seen.
    async fn wait_for(
        events: &mut mpsc::UnboundedReceiver<TransferEvent>,
        pred: impl Fn(&ProgressEvent) -> bool,
    ) -> Vec<TransferEvent> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
                .await
                .expect("timed out")
                .expect("closed");
            let hit = matches!(&event, TransferEvent::Progress(p) if pred(p));
            seen.push(event);
            if hit {
                return seen;
            }
        }
    }

    fn progress_values(events: &[TransferEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                TransferEvent::Progress(p) => Some(p.progress),
                _ => None,
            })
            .collect()
    }

    fn fast_options() -> TransferOptions {
        TransferOptions {
            retry_attempts: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unmatched_track_is_skipped_not_fatal() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic).never_finds("Track 2"),
        );

        h.engine.start_transfer(request(3, fast_options())).unwrap();
        let events = drain(&mut h.events).await;

        assert!(matches!(events.last(), Some(TransferEvent::Completed(_))));
        assert_eq!(h.target.add_batches(), vec![(vec![1, 3], InsertMode::Append)]);
        assert!(h.target.calls().iter().any(|c| matches!(c, AdapterCall::Create(_))));

        let records = h.history.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_tracks, 3);
        assert_eq!(records[0].transferred_tracks, 2);
        assert_eq!(records[0].outcome, RecordOutcome::Completed);
        assert_eq!(records[0].unmatched.len(), 1);
        assert_eq!(records[0].unmatched[0].position, 2);

        let job = h.engine.status().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.errors.is_empty());
    }

    #[tokio::test]
    async fn test_batches_follow_position_order() {
        let mut h = default_harness();
        let options = TransferOptions {
            batch_size: 2,
            ..fast_options()
        };
        let mut playlist = mock_playlist(5);
        playlist.tracks.reverse();

        h.engine
            .start_transfer(TransferRequest::new(playlist, Platform::YouTubeMusic).with_options(options))
            .unwrap();
        drain(&mut h.events).await;

        let batches: Vec<Vec<u32>> = h.target.add_batches().into_iter().map(|(p, _)| p).collect();
        assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
        assert_eq!(h.engine.status().unwrap().transferred_tracks, 5);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_reaches_100() {
        let mut h = default_harness();
        h.engine.start_transfer(request(4, fast_options())).unwrap();
        let events = drain(&mut h.events).await;

        let progress = progress_values(&events);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        assert_eq!(progress.first(), Some(&0));
        assert_eq!(progress.last(), Some(&100));
        // One event per matched item at least
        let matching = events
            .iter()
            .filter(|e| matches!(e, TransferEvent::Progress(p) if p.phase == Phase::Matching))
            .count();
        assert!(matching >= 4);
    }

    #[tokio::test]
    async fn test_start_while_running_is_conflict() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic).with_delay(Duration::from_millis(20)),
        );
        let first = h.engine.start_transfer(request(5, fast_options())).unwrap();
        let before = h.engine.status().unwrap();

        let second = h.engine.start_transfer(request(2, fast_options()));

        assert!(matches!(second, Err(TransferError::Conflict(_))));
        let after = h.engine.status().unwrap();
        assert_eq!(after.id, first);
        assert_eq!(after.state, JobState::Running);
        assert_eq!(after.source_playlist, before.source_playlist);

        drain(&mut h.events).await;
        assert!(h.engine.start_transfer(request(2, fast_options())).is_ok());
        drain(&mut h.events).await;
        assert_eq!(h.history.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_checked_before_validation() {
        let h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic).with_delay(Duration::from_millis(20)),
        );
        h.engine.start_transfer(request(3, fast_options())).unwrap();

        let invalid = TransferRequest::new(mock_playlist(3), Platform::Spotify);
        assert!(matches!(h.engine.start_transfer(invalid), Err(TransferError::Conflict(_))));
        h.engine.cancel_transfer();
    }

    #[tokio::test]
    async fn test_validation_rejects_without_creating_job() {
        let h = default_harness();

        let same = TransferRequest::new(mock_playlist(3), Platform::Spotify);
        assert!(matches!(h.engine.start_transfer(same), Err(TransferError::Validation(_))));

        let empty = request(0, fast_options());
        assert!(matches!(h.engine.start_transfer(empty), Err(TransferError::Validation(_))));

        let ask = request(
            2,
            TransferOptions {
                conflict_resolution: ConflictResolution::Ask,
                ..fast_options()
            },
        );
        assert!(matches!(h.engine.start_transfer(ask), Err(TransferError::Validation(_))));

        let unknown = TransferRequest::new(mock_playlist(2), Platform::AppleMusic);
        assert!(matches!(h.engine.start_transfer(unknown), Err(TransferError::Validation(_))));

        assert!(h.engine.status().is_none());
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let h = default_harness();
        assert!(!h.engine.cancel_transfer());
        assert!(h.engine.status().is_none());
    }

    #[tokio::test]
    async fn test_cancel_during_matching() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic).with_delay(Duration::from_millis(15)),
        );
        h.engine.start_transfer(request(10, fast_options())).unwrap();

        wait_for(&mut h.events, |p| p.phase == Phase::Matching && p.progress > 10).await;
        assert!(h.engine.cancel_transfer());
        let at_cancel = h.engine.status().unwrap().progress;

        let events = drain(&mut h.events).await;
        assert!(matches!(events.last(), Some(TransferEvent::Cancelled { .. })));

        let job = h.engine.status().unwrap();
        assert_eq!(job.state, JobState::Cancelled);
        assert!(job.progress <= at_cancel);
        assert!(progress_values(&events).iter().all(|p| *p <= at_cancel));
        assert!(h.target.add_batches().is_empty());
        assert!(h.target.search_count() < 10);

        let records = h.history.list().await.unwrap();
        assert_eq!(records[0].outcome, RecordOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_during_insertion() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic).with_delay(Duration::from_millis(10)),
        );
        let options = TransferOptions {
            batch_size: 1,
            ..fast_options()
        };
        h.engine.start_transfer(request(8, options)).unwrap();

        wait_for(&mut h.events, |p| p.phase == Phase::InsertingTracks && p.progress > 65).await;
        assert!(h.engine.cancel_transfer());
        let at_cancel = h.engine.status().unwrap().progress;

        let events = drain(&mut h.events).await;
        assert!(matches!(events.last(), Some(TransferEvent::Cancelled { .. })));
        let job = h.engine.status().unwrap();
        assert_eq!(job.state, JobState::Cancelled);
        assert!(job.progress <= at_cancel);
        assert!(h.target.add_batches().len() < 8);
    }

    /// History whose writes block until released, announcing when one starts.
    #[derive(Default)]
    struct SlowHistory {
        inner: MemoryHistory,
        writing: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl HistoryStore for SlowHistory {
        async fn append(&self, record: &TransferRecord) -> Result<(), crate::transfer::history::HistoryError> {
            self.writing.notify_one();
            self.release.notified().await;
            self.inner.append(record).await
        }

        async fn list(&self) -> Result<Vec<TransferRecord>, crate::transfer::history::HistoryError> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn test_cancel_while_writing_history_is_refused() {
        let source = Arc::new(MockAdapter::new(Platform::Spotify));
        let target = Arc::new(MockAdapter::new(Platform::YouTubeMusic));
        let history = Arc::new(SlowHistory::default());
        let (tx, mut events) = mpsc::unbounded_channel();
        let engine = Engine::new(mock_registry(source, target), history.clone()).with_event_sender(tx);

        engine.start_transfer(request(3, fast_options())).unwrap();
        history.writing.notified().await;

        assert!(!engine.cancel_transfer());
        assert!(engine.is_running());
        history.release.notify_one();

        let seen = drain(&mut events).await;
        assert!(matches!(seen.last(), Some(TransferEvent::Completed(_))));
        assert_eq!(progress_values(&seen).last(), Some(&100));
        let job = engine.status().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(history.list().await.unwrap()[0].outcome, RecordOutcome::Completed);
    }

    #[tokio::test]
    async fn test_auth_failure_on_fetch_fails_job() {
        let mut playlist = mock_playlist(0);
        playlist.track_count = 3;
        let mut h = harness(
            MockAdapter::new(Platform::Spotify).with_fetch(Err(TransferError::Auth("expired".into()))),
            MockAdapter::new(Platform::YouTubeMusic),
        );

        h.engine
            .start_transfer(TransferRequest::new(playlist, Platform::YouTubeMusic).with_options(fast_options()))
            .unwrap();
        let events = drain(&mut h.events).await;

        match events.last() {
            Some(TransferEvent::Failed { phase, reason, .. }) => {
                assert_eq!(*phase, Phase::FetchingSource);
                assert!(reason.contains("expired"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(h.target.calls().is_empty());
        let job = h.engine.status().unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.errors.last().map(|e| e.kind), Some(ErrorKind::Auth));
        assert_eq!(h.history.list().await.unwrap()[0].outcome, RecordOutcome::Failed);
    }

    #[tokio::test]
    async fn test_fetches_when_snapshot_has_no_tracks() {
        let fetched: Vec<Track> = (1..=4).rev().map(mock_track).collect();
        let mut playlist = mock_playlist(0);
        playlist.track_count = 4;
        let mut h = harness(
            MockAdapter::new(Platform::Spotify).with_fetch(Ok(fetched)),
            MockAdapter::new(Platform::YouTubeMusic),
        );

        h.engine
            .start_transfer(TransferRequest::new(playlist, Platform::YouTubeMusic).with_options(fast_options()))
            .unwrap();
        drain(&mut h.events).await;

        assert_eq!(h.source.calls(), vec![AdapterCall::Fetch("source-playlist".into())]);
        assert_eq!(h.target.add_batches(), vec![(vec![1, 2, 3, 4], InsertMode::Append)]);
        let record = &h.history.list().await.unwrap()[0];
        assert_eq!(record.total_tracks, 4);
        assert_eq!(record.source_playlist.tracks.len(), 4);
    }

    #[tokio::test]
    async fn test_auth_failure_while_matching_stops_job() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic)
                .script_search("Track 2", vec![Err(TransferError::Auth("revoked".into()))]),
        );

        h.engine.start_transfer(request(4, fast_options())).unwrap();
        let events = drain(&mut h.events).await;

        assert!(matches!(
            events.last(),
            Some(TransferEvent::Failed { phase: Phase::Matching, .. })
        ));
        assert_eq!(h.target.search_count(), 2);
        assert!(!h.target.calls().iter().any(|c| matches!(c, AdapterCall::Create(_))));
    }

    #[tokio::test]
    async fn test_transient_search_exhaustion_is_recorded() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic)
                .script_search("Track 1", vec![Err(TransferError::Transient("503".into())); 2]),
        );

        h.engine.start_transfer(request(3, fast_options())).unwrap();
        let events = drain(&mut h.events).await;

        assert!(matches!(events.last(), Some(TransferEvent::Completed(_))));
        let job = h.engine.status().unwrap();
        assert_eq!(job.transferred_tracks, 2);
        assert_eq!(job.errors.len(), 1);
        assert_eq!(job.errors[0].phase, Phase::Matching);
        assert_eq!(job.errors[0].kind, ErrorKind::Transient);
        assert_eq!(job.errors[0].position, Some(1));
    }

    #[tokio::test]
    async fn test_quota_on_create_fails_job() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic).fail_create(vec![TransferError::Quota("daily limit".into())]),
        );

        h.engine.start_transfer(request(2, fast_options())).unwrap();
        let events = drain(&mut h.events).await;

        assert!(matches!(
            events.last(),
            Some(TransferEvent::Failed { phase: Phase::CreatingPlaylist, .. })
        ));
        assert!(h.target.add_batches().is_empty());
        let record = &h.history.list().await.unwrap()[0];
        assert!(record.target_playlist.is_none());
        assert_eq!(record.transferred_tracks, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_later_batches() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic)
                .fail_add(vec![TransferError::Transient("502".into()); 2]),
        );
        let options = TransferOptions {
            batch_size: 2,
            retry_attempts: 2,
            ..Default::default()
        };

        h.engine.start_transfer(request(4, options)).unwrap();
        let events = drain(&mut h.events).await;

        assert!(matches!(events.last(), Some(TransferEvent::Completed(_))));
        let batches: Vec<Vec<u32>> = h.target.add_batches().into_iter().map(|(p, _)| p).collect();
        assert_eq!(batches, vec![vec![1, 2], vec![1, 2], vec![3, 4]]);
        let job = h.engine.status().unwrap();
        assert_eq!(job.transferred_tracks, 2);
        assert_eq!(job.errors.len(), 1);
        assert_eq!(job.errors[0].phase, Phase::InsertingTracks);
    }

    #[tokio::test]
    async fn test_region_locked_track_is_reported() {
        let mut h = harness(
            MockAdapter::new(Platform::Spotify),
            MockAdapter::new(Platform::YouTubeMusic).unavailable_at(2),
        );

        h.engine.start_transfer(request(3, fast_options())).unwrap();
        drain(&mut h.events).await;

        let job = h.engine.status().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.transferred_tracks, 2);
        assert_eq!(job.errors[0].position, Some(2));
    }

    fn duplicate_playlist() -> Playlist {
        let mut first = mock_track(1);
        first.name = "Same Song".into();
        let mut second = mock_track(2);
        second.name = "Same Song".into();
        let third = mock_track(3);
        Playlist::new("dupes", "Dupes", Platform::Spotify).with_tracks(vec![first, second, third])
    }

    #[tokio::test]
    async fn test_duplicates_skipped_by_default() {
        let mut h = default_harness();
        h.engine
            .start_transfer(TransferRequest::new(duplicate_playlist(), Platform::YouTubeMusic).with_options(fast_options()))
            .unwrap();
        drain(&mut h.events).await;

        assert_eq!(h.target.add_batches(), vec![(vec![1, 2, 3], InsertMode::Append)]);
        assert_eq!(h.engine.status().unwrap().transferred_tracks, 2);
    }

    #[tokio::test]
    async fn test_duplicates_replaced() {
        let mut h = default_harness();
        let options = TransferOptions {
            conflict_resolution: ConflictResolution::Replace,
            ..fast_options()
        };
        h.engine
            .start_transfer(TransferRequest::new(duplicate_playlist(), Platform::YouTubeMusic).with_options(options))
            .unwrap();
        drain(&mut h.events).await;

        assert_eq!(
            h.target.add_batches(),
            vec![
                (vec![1, 2, 3], InsertMode::Append),
                (vec![2], InsertMode::Replace)
            ]
        );
        assert_eq!(h.engine.status().unwrap().transferred_tracks, 3);
    }

    #[tokio::test]
    async fn test_duplicates_ask_caller() {
        let source = Arc::new(MockAdapter::new(Platform::Spotify));
        let target = Arc::new(MockAdapter::new(Platform::YouTubeMusic));
        let decider = Arc::new(RecordingDecider::new(vec![ConflictDecision::Replace]));
        let (tx, stream) = event_channel();
        let engine = Engine::new(mock_registry(source, target.clone()), Arc::new(MemoryHistory::new()))
            .with_decider(decider.clone())
            .with_event_sender(tx);
        let options = TransferOptions {
            conflict_resolution: ConflictResolution::Ask,
            ..fast_options()
        };

        engine
            .start_transfer(TransferRequest::new(duplicate_playlist(), Platform::YouTubeMusic).with_options(options))
            .unwrap();
        let events: Vec<TransferEvent> = stream
            .take_while(|e| futures::future::ready(!e.is_terminal()))
            .collect()
            .await;

        let asked = decider.asked.lock().clone();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].position, 2);
        assert!(events.iter().any(|e| matches!(e, TransferEvent::ConflictPending(c) if c.position == 2)));
        assert_eq!(target.add_batches().last(), Some(&(vec![2], InsertMode::Replace)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    use crate::test_utils::mock_track;

    proptest! {
        /// Batches are full except the last and concatenate back to the input.
        #[test]
        fn prop_partition_preserves_order(count in 0u32..300, batch_size in 0usize..120) {
            let tracks: Vec<Track> = (1..=count).map(mock_track).collect();
            let batches = partition(&tracks, batch_size);

            let size = batch_size.max(1);
            prop_assert_eq!(batches.len(), tracks.len().div_ceil(size));
            for (index, batch) in batches.iter().enumerate() {
                prop_assert!(!batch.is_empty() && batch.len() <= size);
                if index + 1 < batches.len() {
                    prop_assert_eq!(batch.len(), size);
                }
            }
            let positions: Vec<u32> = batches.iter().flat_map(|b| b.iter().map(|t| t.position)).collect();
            prop_assert_eq!(positions, (1..=count).collect::<Vec<_>>());
        }
    }
}
