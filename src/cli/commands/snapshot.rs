//! `snapshot`: fetch a playlist through its platform adapter.

use std::path::Path;

use anyhow::Context;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::model::{Platform, Playlist};
use crate::platforms;

pub fn cmd_snapshot(
    rt: &Runtime,
    config: &Config,
    platform: Platform,
    playlist_id: &str,
    name: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let registry = platforms::registry_from_config(config)?;
        let link = registry.require(platform)?;

        let tracks = link
            .call(config.transfer.retry_attempts, |adapter| {
                let playlist_id = playlist_id.to_string();
                async move { adapter.fetch_tracks(&playlist_id).await }
            })
            .await
            .with_context(|| format!("Failed to fetch {} playlist {}", platform.display_name(), playlist_id))?;

        let playlist = Playlist::new(playlist_id, name.unwrap_or(playlist_id), platform).with_tracks(tracks);
        let json = serde_json::to_string_pretty(&playlist)?;

        match output {
            Some(path) => {
                std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("Saved {} tracks to {}", playlist.track_count, path.display());
            }
            None => println!("{}", json),
        }
        Ok(())
    })
}
