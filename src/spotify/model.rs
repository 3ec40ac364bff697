//! Upstream JSON shapes
//!
//! Mirrors what the player endpoints actually send. Decoding is lenient:
//! containers default missing fields to zero values so upstream schema drift
//! degrades gracefully instead of turning into decode failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of what is playing right now
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentlyPlaying {
    /// Server-side timestamp of the snapshot (epoch millis)
    pub timestamp: i64,
    /// Playback device
    pub device: Device,
    /// Where playback was started from (album, playlist, ...); nullable
    pub context: Option<PlayContext>,
    /// Progress into the track (millis)
    pub progress_ms: i64,
    /// The playing track; null during ad breaks and for unavailable items
    pub item: Option<Track>,
    /// "track", "episode", "ad" or "unknown"
    pub currently_playing_type: String,
    /// Allowed/disallowed player actions
    pub actions: Actions,
    /// Whether playback is active
    pub is_playing: bool,
}

/// Playback device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    /// Device id
    pub id: String,
    /// Currently active device?
    pub is_active: bool,
    /// Private session?
    pub is_private_session: bool,
    /// Restricted device?
    pub is_restricted: bool,
    /// Human-readable name
    pub name: String,
    /// Device class ("Computer", "Smartphone", ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Volume 0-100
    pub volume_percent: i64,
    /// Whether volume can be set remotely
    pub supports_volume: bool,
}

/// Player action flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Actions {
    /// Actions the player currently refuses
    pub disallows: Disallows,
}

/// Disallowed player actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Disallows {
    /// Resuming is disallowed (already playing)
    pub resuming: bool,
}

/// Context playback was started from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayContext {
    /// Open-in-app links
    pub external_urls: ExternalUrls,
    /// API href of the context
    pub href: String,
    /// "album", "playlist", "artist", ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Spotify URI of the context
    pub uri: String,
}

/// External links for an entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalUrls {
    /// Web player link
    pub spotify: String,
}

/// A track, as it appears in the current snapshot and in the queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    /// Containing album
    pub album: Album,
    /// Credited artists
    pub artists: Vec<Artist>,
    /// Disc number (multi-disc albums)
    pub disc_number: i64,
    /// Track length (millis)
    pub duration_ms: i64,
    /// Explicit lyrics flag
    pub explicit: bool,
    /// Open-in-app links
    pub external_urls: ExternalUrls,
    /// API href of the track
    pub href: String,
    /// Track id
    pub id: String,
    /// Local file rather than catalog track
    pub is_local: bool,
    /// Playable in the current market (queue entries only)
    pub is_playable: bool,
    /// Track title
    pub name: String,
    /// Popularity 0-100
    pub popularity: i64,
    /// 30-second preview clip, when one exists
    pub preview_url: String,
    /// Position within the disc
    pub track_number: i64,
    /// Always "track" for tracks
    #[serde(rename = "type")]
    pub kind: String,
    /// Spotify URI
    pub uri: String,
}

/// Album summary attached to a track
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Album {
    /// "album", "single" or "compilation"
    pub album_type: String,
    /// Credited artists
    pub artists: Vec<Artist>,
    /// Open-in-app links
    pub external_urls: ExternalUrls,
    /// API href of the album
    pub href: String,
    /// Album id
    pub id: String,
    /// Cover art in various sizes
    pub images: Vec<Image>,
    /// Album title
    pub name: String,
    /// Number of tracks
    pub total_tracks: i64,
    /// Always "album"
    #[serde(rename = "type")]
    pub kind: String,
    /// Spotify URI
    pub uri: String,
}

/// Artist summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Artist {
    /// Open-in-app links
    pub external_urls: ExternalUrls,
    /// API href of the artist
    pub href: String,
    /// Artist id
    pub id: String,
    /// Artist name
    pub name: String,
    /// Always "artist"
    #[serde(rename = "type")]
    pub kind: String,
    /// Spotify URI
    pub uri: String,
}

/// Cover art
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    /// Pixel height
    pub height: i64,
    /// Image URL
    pub url: String,
    /// Pixel width
    pub width: i64,
}

/// The play queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Queue {
    /// Upcoming tracks, nearest first
    pub queue: Vec<Track>,
}

/// Listening history window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentlyPlayed {
    /// Most recent plays, newest first
    pub items: Vec<PlayHistoryItem>,
}

/// One entry of the listening history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayHistoryItem {
    /// The played track
    pub track: Track,
    /// When the play finished
    pub played_at: DateTime<Utc>,
    /// Context the play started from; nullable
    #[serde(default)]
    pub context: Option<PlayContext>,
}

/// Body of a play request, forwarded to the player as-is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayRequest {
    /// Context to play (album/playlist/artist URI)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_uri: Option<String>,
    /// Explicit track URIs to play instead of a context
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<String>,
    /// Where in the context to start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
    /// Seek position within the first track (millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_ms: Option<i64>,
}

/// Start offset within a play context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Offset {
    /// Zero-based position within the context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// Or a specific track URI within the context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}
