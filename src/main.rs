//! Playlist Porter - moves playlists between music streaming services.
//!
//! A transfer reads a playlist from the source platform, resolves each track
//! on the target platform, creates the target playlist and inserts the
//! matches in batches. Progress, conflicts and the final outcome are reported
//! as events; every finished transfer is recorded in a local history.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod platforms;
#[cfg(test)]
pub mod test_utils;
pub mod transfer;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging (stderr, so snapshots written to stdout stay clean)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("playlist_porter=info")))
        .init();

    cli::run_command(&args)
}
