//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `transfer`: Run one playlist transfer
//! - `snapshot`: Fetch a playlist into a snapshot file
//! - `history`: Show past transfers

mod history;
mod snapshot;
mod transfer;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::model::Platform;
use crate::transfer::{ConflictResolution, SqliteHistory};

pub use history::cmd_history;
pub use snapshot::cmd_snapshot;
pub use transfer::cmd_transfer;

/// Playlist Porter CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: OS config directory)
    #[arg(long, global = true, env = "PLAYLIST_PORTER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Transfer a playlist snapshot to another platform
    Transfer(TransferArgs),
    /// Fetch a playlist and write it as a snapshot
    Snapshot {
        /// Platform the playlist lives on
        #[arg(short, long)]
        platform: Platform,
        /// Platform playlist id
        #[arg(long)]
        playlist_id: String,
        /// Playlist name to record (defaults to the id)
        #[arg(short, long)]
        name: Option<String>,
        /// Write the snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List past transfers, newest first
    History {
        /// History database path
        #[arg(long)]
        db: Option<PathBuf>,
        /// Show at most this many transfers
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print where the config file lives
    ConfigPath,
}

/// Arguments of `transfer`. Unset options fall back to the config file.
#[derive(Args)]
pub struct TransferArgs {
    /// Snapshot JSON of the source playlist
    pub snapshot: PathBuf,
    /// Target platform
    #[arg(long)]
    pub to: Platform,
    /// Tracks per insert request
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Attempts per platform call
    #[arg(long)]
    pub retry_attempts: Option<u32>,
    /// What to do with tracks already in the target: skip, replace or ask
    #[arg(long)]
    pub conflict: Option<ConflictResolution>,
    /// History database path
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };

    match &cli.command {
        Commands::Transfer(args) => {
            let rt = Runtime::new()?;
            cmd_transfer(&rt, &config, args)
        }
        Commands::Snapshot {
            platform,
            playlist_id,
            name,
            output,
        } => {
            let rt = Runtime::new()?;
            cmd_snapshot(&rt, &config, *platform, playlist_id, name.as_deref(), output.as_deref())
        }
        Commands::History { db, limit, json } => {
            let rt = Runtime::new()?;
            cmd_history(&rt, &config, db.as_deref(), *limit, *json)
        }
        Commands::ConfigPath => {
            match cli.config.clone().or_else(config::config_path) {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("Could not determine config directory"),
            }
            Ok(())
        }
    }
}

/// Open the history database from `--db`, the config, or the default location.
async fn open_history(config: &Config, db: Option<&Path>) -> anyhow::Result<SqliteHistory> {
    let path = db
        .map(Path::to_path_buf)
        .or_else(|| config.history_path())
        .context("No history database path available")?;
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    SqliteHistory::open(&SqliteHistory::url_for(&path))
        .await
        .with_context(|| format!("Failed to open history database {}", path.display()))
}
