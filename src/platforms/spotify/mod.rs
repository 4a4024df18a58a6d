//! Spotify Web API integration
//!
//! Reads playlists, searches the catalog and writes playlists for the user
//! that owns the access token.
//! API docs: https://developer.spotify.com/documentation/web-api

mod adapter;
mod client;
pub mod dto;

pub use adapter::SpotifyAdapter;
pub use client::SpotifyClient;
