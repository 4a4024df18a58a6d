//! YouTube Music integration via the YouTube Data API v3
//!
//! YouTube Music playlists are ordinary YouTube playlists, so reads and writes
//! go through the public Data API.
//! API docs: https://developers.google.com/youtube/v3/docs

mod adapter;
mod client;
pub mod dto;

pub use adapter::YouTubeAdapter;
pub use client::YouTubeClient;
