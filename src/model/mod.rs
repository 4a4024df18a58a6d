//! Core data models shared by every platform.
//!
//! Defines the primary entities: [`Track`], [`Playlist`], [`Platform`] and
//! [`Credential`]. These serialize with camelCase field names so a playlist
//! snapshot written by an extractor can be handed straight to the engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A music service the engine can read from or write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Spotify,
    #[serde(rename = "youtube-music")]
    YouTubeMusic,
    AppleMusic,
    AmazonMusic,
}

impl Platform {
    /// All supported platforms, in display order.
    pub const ALL: [Platform; 4] = [
        Platform::Spotify,
        Platform::YouTubeMusic,
        Platform::AppleMusic,
        Platform::AmazonMusic,
    ];

    /// Stable identifier used in config keys, CLI flags and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::YouTubeMusic => "youtube-music",
            Platform::AppleMusic => "apple-music",
            Platform::AmazonMusic => "amazon-music",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::YouTubeMusic => "YouTube Music",
            Platform::AppleMusic => "Apple Music",
            Platform::AmazonMusic => "Amazon Music",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "spotify" => Ok(Platform::Spotify),
            "youtube-music" | "youtube" | "ytmusic" => Ok(Platform::YouTubeMusic),
            "apple-music" | "apple" => Ok(Platform::AppleMusic),
            "amazon-music" | "amazon" => Ok(Platform::AmazonMusic),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// A single track as seen on one platform.
///
/// Tracks are values: resolving a source track produces a new `Track` for the
/// target platform, the source is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Track title
    pub name: String,
    /// Credited artists; empty means unknown
    #[serde(default)]
    pub artists: Vec<String>,
    /// Album title, may be empty
    #[serde(default)]
    pub album: String,
    /// Duration as shown by the source (format is platform specific)
    #[serde(default)]
    pub duration: Option<String>,
    /// 1-based position within its playlist
    pub position: u32,
    /// Platform this track belongs to
    pub platform: Platform,
    /// Platform identifier, present once resolved
    #[serde(default)]
    pub external_id: Option<String>,
}

impl Track {
    /// Create an unresolved track.
    pub fn new(name: impl Into<String>, artists: Vec<String>, position: u32, platform: Platform) -> Self {
        Self {
            name: name.into(),
            artists,
            album: String::new(),
            duration: None,
            position,
            platform,
            external_id: None,
        }
    }

    /// First credited artist, if any.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    /// Artists joined for display, "Unknown Artist" when none are known.
    pub fn artist_line(&self) -> String {
        if self.artists.is_empty() {
            "Unknown Artist".to_string()
        } else {
            self.artists.join(", ")
        }
    }

    /// Build the resolved counterpart of `self` on another platform.
    ///
    /// Metadata comes from the platform's candidate, the position is kept so
    /// transfer order survives resolution.
    pub fn resolved_as(&self, candidate: &Track) -> Track {
        Track {
            position: self.position,
            ..candidate.clone()
        }
    }

    /// Parse the opaque duration string into seconds when it looks like
    /// `m:ss`, `h:mm:ss` or a plain number of seconds.
    pub fn duration_secs(&self) -> Option<u32> {
        let raw = self.duration.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let mut total: u32 = 0;
        for part in raw.split(':') {
            let value: u32 = part.trim().parse().ok()?;
            total = total.checked_mul(60)?.checked_add(value)?;
        }
        Some(total)
    }
}

/// A playlist on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// Platform-scoped identifier
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Must equal `tracks.len()` whenever `tracks` is populated
    #[serde(default)]
    pub track_count: usize,
    pub platform: Platform,
    #[serde(default)]
    pub url: String,
    /// Ordered tracks; order is transfer order
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Playlist {
    /// Create an empty playlist handle.
    pub fn new(id: impl Into<String>, name: impl Into<String>, platform: Platform) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            track_count: 0,
            platform,
            url: String::new(),
            tracks: Vec::new(),
        }
    }

    /// Replace the track list, keeping `track_count` consistent.
    pub fn with_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.track_count = tracks.len();
        self.tracks = tracks;
        self
    }
}

/// Opaque per-platform authorization, acquired outside this crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// True when the token is empty or past its expiry.
    pub fn is_expired(&self) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

// Tokens never end up in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_platform_parse_aliases() {
        assert_eq!("spotify".parse::<Platform>(), Ok(Platform::Spotify));
        assert_eq!("YouTube_Music".parse::<Platform>(), Ok(Platform::YouTubeMusic));
        assert_eq!("apple".parse::<Platform>(), Ok(Platform::AppleMusic));
        assert!("tidal".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serde_matches_as_str() {
        for platform in Platform::ALL {
            let json = serde_json::to_string(&platform).unwrap();
            assert_eq!(json, format!("\"{}\"", platform.as_str()));
        }
    }

    #[test]
    fn test_track_snapshot_json() {
        let json = r#"{
            "name": "Song",
            "artists": ["A", "B"],
            "position": 3,
            "platform": "spotify"
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.name, "Song");
        assert_eq!(track.artist_line(), "A, B");
        assert!(track.album.is_empty());
        assert!(track.external_id.is_none());
    }

    #[test]
    fn test_resolved_as_keeps_position() {
        let source = Track::new("Song", vec!["A".into()], 7, Platform::Spotify);
        let mut candidate = Track::new("Song (Remastered)", vec!["A".into()], 1, Platform::YouTubeMusic);
        candidate.external_id = Some("yt-1".into());

        let resolved = source.resolved_as(&candidate);

        assert_eq!(resolved.position, 7);
        assert_eq!(resolved.platform, Platform::YouTubeMusic);
        assert_eq!(resolved.external_id.as_deref(), Some("yt-1"));
        assert_eq!(source.platform, Platform::Spotify);
    }

    #[test]
    fn test_duration_secs() {
        let mut track = Track::new("x", vec![], 1, Platform::Spotify);
        track.duration = Some("3:25".into());
        assert_eq!(track.duration_secs(), Some(205));
        track.duration = Some("1:02:03".into());
        assert_eq!(track.duration_secs(), Some(3723));
        track.duration = Some("abc".into());
        assert_eq!(track.duration_secs(), None);
    }

    #[test]
    fn test_credential_expiry() {
        let fresh = Credential::new("tok", Some(Utc::now() + Duration::hours(1)));
        let stale = Credential::new("tok", Some(Utc::now() - Duration::seconds(1)));
        let forever = Credential::new("tok", None);
        let empty = Credential::new("", None);

        assert!(!fresh.is_expired());
        assert!(stale.is_expired());
        assert!(!forever.is_expired());
        assert!(empty.is_expired());
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let cred = Credential::new("super-secret", None);
        assert!(!format!("{cred:?}").contains("super-secret"));
    }
}
