//! Command-line interface for playlist-porter.
//!
//! Transfers run from a playlist snapshot (JSON) produced by `snapshot` or by
//! any other tool that writes the same shape.

mod commands;

pub use commands::{Cli, Commands, run_command};
