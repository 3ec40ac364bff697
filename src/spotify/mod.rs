//! Spotify Web API surface
//!
//! The authenticated upstream client plus the JSON shapes it decodes.
//! Payloads are re-served to callers exactly as decoded; this module never
//! fabricates playback data it did not receive.

mod client;
mod model;

pub use client::SpotifyClient;
pub use model::{
    Actions, Album, Artist, CurrentlyPlaying, Device, Disallows, ExternalUrls, Image, Offset,
    PlayContext, PlayHistoryItem, PlayRequest, Queue, RecentlyPlayed, Track,
};
