//! Music service integrations.
//!
//! Each platform follows the same split:
//! - `client.rs` - HTTP calls and status classification
//! - `dto.rs` - exact wire shapes
//! - `adapter.rs` - DTO → domain conversion and the [`PlatformAdapter`] impl
//!
//! [`registry_from_config`] wires the configured platforms into an
//! [`AdapterRegistry`] for the engine.

pub mod amazon;
pub mod apple_music;
pub mod http;
pub mod spotify;
pub mod youtube;

use std::sync::Arc;

use crate::config::Config;
use crate::model::{Platform, Track};
use crate::transfer::matcher::WeightedMatch;
use crate::transfer::traits::PlatformAdapter;
use crate::transfer::{AdapterRegistry, PlatformLink, RateLimiter, RetryExecutor};

pub use amazon::AmazonMusicAdapter;
pub use apple_music::{AppleMusicAdapter, AppleMusicClient};
pub use spotify::{SpotifyAdapter, SpotifyClient};
pub use youtube::{YouTubeAdapter, YouTubeClient};

/// Milliseconds → "m:ss", or "h:mm:ss" from an hour up.
pub fn format_duration(ms: u64) -> String {
    let total = ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Highest-scoring search candidate for `source`. Ties keep the platform's
/// own ranking. Whether the winner is good enough is the engine's call.
pub fn pick_best(source: &Track, candidates: Vec<Track>) -> Option<Track> {
    let scorer = WeightedMatch::default();
    candidates
        .into_iter()
        .map(|candidate| (scorer.score(source, &candidate), candidate))
        .rev()
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate)
}

/// Build the adapter for `platform` from its configured credentials.
/// `None` when the platform has no credentials configured.
fn adapter_for(config: &Config, platform: Platform) -> crate::error::Result<Option<Arc<dyn PlatformAdapter>>> {
    if platform == Platform::AmazonMusic {
        return Ok(Some(Arc::new(AmazonMusicAdapter::new())));
    }
    let Some(credentials) = config.credentials.for_platform(platform) else {
        return Ok(None);
    };
    let credential = credentials.credential();

    let adapter: Arc<dyn PlatformAdapter> = match platform {
        Platform::Spotify => Arc::new(SpotifyAdapter::new(SpotifyClient::new(credential)?)),
        Platform::YouTubeMusic => Arc::new(YouTubeAdapter::new(YouTubeClient::new(
            credential,
            credentials.api_key.clone(),
        )?)),
        Platform::AppleMusic => Arc::new(AppleMusicAdapter::new(AppleMusicClient::new(
            credentials.developer_token.clone().unwrap_or_default(),
            credential,
            credentials.storefront.clone().unwrap_or_else(|| "us".to_string()),
        )?)),
        Platform::AmazonMusic => Arc::new(AmazonMusicAdapter::new()),
    };
    Ok(Some(adapter))
}

/// Registry with one rate-limited, retrying link per usable platform.
///
/// Platforms without credentials are left out, so transfers touching them
/// fail validation. Amazon Music is always present and always unsupported.
pub fn registry_from_config(config: &Config) -> crate::error::Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    for platform in Platform::ALL {
        let Some(adapter) = adapter_for(config, platform)? else {
            tracing::debug!(%platform, "No credentials configured, platform unavailable");
            continue;
        };
        registry.register(PlatformLink::new(
            platform,
            adapter,
            RateLimiter::per_second(config.rate_limits.for_platform(platform)),
            RetryExecutor::new(config.retry.base_delay()),
        ));
    }
    tracing::debug!(platforms = ?registry.platforms(), "Adapter registry ready");
    Ok(registry)
}
