//! `transfer`: run one playlist transfer and follow its events.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::runtime::Runtime;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{TransferArgs, open_history};
use crate::config::Config;
use crate::error::{Error, ResultExt};
use crate::model::Playlist;
use crate::platforms;
use crate::transfer::domain::TransferSummary;
use crate::transfer::{
    ConflictDecider, ConflictDecision, ConflictResolution, Engine, HistoryStore, MatchResolver, TrackConflict,
    TransferEvent, TransferRequest, WeightedMatch, event_channel,
};

/// Run a transfer to completion, cancelling on Ctrl-C.
pub fn cmd_transfer(rt: &Runtime, config: &Config, args: &TransferArgs) -> anyhow::Result<()> {
    rt.block_on(async {
        let playlist = read_snapshot(&args.snapshot)?;

        let mut options = config.transfer.to_options();
        if let Some(batch_size) = args.batch_size {
            options.batch_size = batch_size;
        }
        if let Some(attempts) = args.retry_attempts {
            options.retry_attempts = attempts;
        }
        if let Some(conflict) = args.conflict {
            options.conflict_resolution = conflict;
        }

        let registry = platforms::registry_from_config(config)?;
        let history: Arc<dyn HistoryStore> = Arc::new(open_history(config, args.db.as_deref()).await?);
        let resolver = MatchResolver::new(Arc::new(WeightedMatch::new(config.matching.min_score)));
        let (tx, events) = event_channel();

        let mut engine = Engine::new(registry, history)
            .with_resolver(resolver)
            .with_event_sender(tx);
        if options.conflict_resolution == ConflictResolution::Ask {
            engine = engine.with_decider(Arc::new(PromptDecider::new()));
        }

        println!(
            "Transferring '{}' ({} tracks) from {} to {}",
            playlist.name,
            playlist.track_count,
            playlist.platform.display_name(),
            args.to.display_name()
        );
        let request = TransferRequest::new(playlist, args.to).with_options(options);
        let job_id = engine.start_transfer(request)?;
        info!(%job_id, "Transfer started");

        let canceller = engine.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling after the current step...");
                canceller.cancel_transfer();
            }
        });

        let mut events = std::pin::pin!(events);
        let mut result = Ok(());
        while let Some(event) = events.next().await {
            match event {
                TransferEvent::Progress(progress) => {
                    println!("[{:>3}%] {}", progress.progress, progress.message);
                }
                TransferEvent::ConflictPending(_) => {}
                TransferEvent::Completed(summary) => {
                    print_summary(&summary);
                    break;
                }
                TransferEvent::Failed { phase, reason, .. } => {
                    result = Err(anyhow::anyhow!("Transfer failed while {}: {}", phase, reason));
                    break;
                }
                TransferEvent::Cancelled { progress, .. } => {
                    println!("Transfer cancelled at {}%", progress);
                    break;
                }
            }
        }
        ctrl_c.abort();
        result
    })
}

/// Load a playlist snapshot written by `snapshot` (or any tool using its shape).
fn read_snapshot(path: &Path) -> crate::error::Result<Playlist> {
    if !path.exists() {
        return Err(Error::not_found(path));
    }
    let raw = std::fs::read_to_string(path).with_context("Failed to read snapshot")?;
    serde_json::from_str::<Playlist>(&raw).with_context(format!("{} is not a playlist snapshot", path.display()))
}

fn print_summary(summary: &TransferSummary) {
    println!();
    println!("Transfer complete");
    println!("=================");
    println!("Transferred: {}/{}", summary.transferred_tracks, summary.total_tracks);
    println!("Unmatched:   {}", summary.unmatched);
    if let Some(playlist) = &summary.target_playlist {
        if playlist.url.is_empty() {
            println!("Playlist:    {} ({})", playlist.name, playlist.id);
        } else {
            println!("Playlist:    {} ({})", playlist.name, playlist.url);
        }
    }
    if !summary.errors.is_empty() {
        println!("Errors:");
        for error in summary.errors.iter().take(10) {
            match error.position {
                Some(position) => println!("  #{} {}", position, error.message),
                None => println!("  {}", error.message),
            }
        }
        if summary.errors.len() > 10 {
            println!("  ... and {} more", summary.errors.len() - 10);
        }
    }
}

/// Asks on the terminal whether to replace each duplicate.
struct PromptDecider {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl PromptDecider {
    fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

#[async_trait]
impl ConflictDecider for PromptDecider {
    async fn decide(&self, conflict: &TrackConflict) -> ConflictDecision {
        println!(
            "'{}' by {} (#{}) is already in the playlist. Replace it? [y/N]",
            conflict.track.name,
            conflict.track.artist_line(),
            conflict.position
        );
        match self.lines.lock().await.next_line().await {
            Ok(Some(line)) => parse_answer(&line),
            Ok(None) => ConflictDecision::Skip,
            Err(e) => {
                warn!("Could not read answer, skipping track: {}", e);
                ConflictDecision::Skip
            }
        }
    }
}

fn parse_answer(line: &str) -> ConflictDecision {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" | "r" | "replace" => ConflictDecision::Replace,
        _ => ConflictDecision::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_playlist;

    #[test]
    fn test_read_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("road-trip.json");
        std::fs::write(&path, serde_json::to_string(&mock_playlist(3)).unwrap()).unwrap();

        let playlist = read_snapshot(&path).unwrap();

        assert_eq!(playlist, mock_playlist(3));
    }

    #[test]
    fn test_read_snapshot_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(read_snapshot(&missing), Err(Error::NotFound(_))));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{\"name\": 3}").unwrap();
        let err = read_snapshot(&garbage).unwrap_err();
        assert!(err.to_string().contains("is not a playlist snapshot"));
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), ConflictDecision::Replace);
        assert_eq!(parse_answer(" Replace "), ConflictDecision::Replace);
        assert_eq!(parse_answer(""), ConflictDecision::Skip);
        assert_eq!(parse_answer("no"), ConflictDecision::Skip);
    }
}
