//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\playlist-porter\config.toml
//! - macOS: ~/Library/Application Support/playlist-porter/config.toml
//! - Linux: ~/.config/playlist-porter/config.toml
//!
//! The config file is human-readable and editable. Every section is optional;
//! missing keys take their defaults.
//!
//! ```toml
//! [credentials.spotify]
//! access_token = "BQD..."
//! expires_at = "2026-01-01T12:00:00Z"
//!
//! [credentials.apple-music]
//! access_token = "music-user-token"
//! developer_token = "eyJhbGciOi..."
//! storefront = "gb"
//!
//! [transfer]
//! batch_size = 50
//! conflict_resolution = "skip"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Credential, Platform};
use crate::transfer::domain::{ConflictResolution, TransferOptions};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform credentials (keep separate for potential future encryption)
    pub credentials: Credentials,

    /// Defaults for new transfers
    pub transfer: TransferConfig,

    /// Backoff between retried platform calls
    pub retry: RetryConfig,

    /// Requests per second per platform
    pub rate_limits: RateLimitConfig,

    /// Track matching settings
    pub matching: MatchingConfig,

    /// Transfer history settings
    pub history: HistoryConfig,
}

/// Platform credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Credentials {
    pub spotify: Option<PlatformCredentials>,
    pub youtube_music: Option<PlatformCredentials>,
    pub apple_music: Option<PlatformCredentials>,
    pub amazon_music: Option<PlatformCredentials>,
}

impl Credentials {
    pub fn for_platform(&self, platform: Platform) -> Option<&PlatformCredentials> {
        match platform {
            Platform::Spotify => self.spotify.as_ref(),
            Platform::YouTubeMusic => self.youtube_music.as_ref(),
            Platform::AppleMusic => self.apple_music.as_ref(),
            Platform::AmazonMusic => self.amazon_music.as_ref(),
        }
    }
}

/// One platform's tokens
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformCredentials {
    /// OAuth access token (Apple Music: the Music User Token)
    pub access_token: String,

    /// When the access token stops working
    pub expires_at: Option<DateTime<Utc>>,

    /// Apple Music developer token (JWT)
    pub developer_token: Option<String>,

    /// YouTube Data API key
    pub api_key: Option<String>,

    /// Apple Music catalog storefront ("us" when unset)
    pub storefront: Option<String>,
}

impl PlatformCredentials {
    pub fn credential(&self) -> Credential {
        Credential::new(self.access_token.clone(), self.expires_at)
    }
}

impl std::fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCredentials")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("developer_token", &self.developer_token.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("storefront", &self.storefront)
            .finish()
    }
}

/// Defaults applied to transfers started from the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Tracks per insert request
    pub batch_size: usize,

    /// Attempts per platform call (first try included)
    pub retry_attempts: u32,

    /// "skip", "replace" or "ask"
    pub conflict_resolution: ConflictResolution,
}

impl Default for TransferConfig {
    fn default() -> Self {
        let options = TransferOptions::default();
        Self {
            batch_size: options.batch_size,
            retry_attempts: options.retry_attempts,
            conflict_resolution: options.conflict_resolution,
        }
    }
}

impl TransferConfig {
    pub fn to_options(&self) -> TransferOptions {
        TransferOptions {
            conflict_resolution: self.conflict_resolution,
            batch_size: self.batch_size,
            retry_attempts: self.retry_attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Backoff unit; attempt n waits n times this before retrying
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { base_delay_ms: 1000 }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    pub spotify: u32,
    pub youtube_music: u32,
    pub apple_music: u32,
    pub amazon_music: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            spotify: 10,
            youtube_music: 5,
            apple_music: 10,
            amazon_music: 1,
        }
    }
}

impl RateLimitConfig {
    /// Requests per second allowed for `platform` (never zero).
    pub fn for_platform(&self, platform: Platform) -> u32 {
        let limit = match platform {
            Platform::Spotify => self.spotify,
            Platform::YouTubeMusic => self.youtube_music,
            Platform::AppleMusic => self.apple_music,
            Platform::AmazonMusic => self.amazon_music,
        };
        limit.max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum weighted score for a candidate to count as the same track
    pub min_score: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { min_score: 0.6 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// SQLite database file (default: `history.db` next to the config)
    pub path: Option<PathBuf>,
}

impl Config {
    /// Where transfer history lives.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history
            .path
            .clone()
            .or_else(|| config_dir().map(|d| d.join("history.db")))
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playlist-porter"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to `path`
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path).map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
