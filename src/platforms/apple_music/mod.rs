//! Apple Music API integration.
//!
//! Transfers read and write the user's *library* playlists. Catalog search
//! runs against the storefront from config.

mod adapter;
mod client;
pub mod dto;

pub use adapter::AppleMusicAdapter;
pub use client::AppleMusicClient;
