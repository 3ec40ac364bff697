//! Authenticated upstream client
//!
//! Thin wrapper over reqwest that attaches the bearer credential from the
//! token lifecycle and enforces the status discipline of each player
//! endpoint. Status handling follows what the endpoints really do: 204 from
//! the snapshot and queue endpoints means "nothing there", everything else
//! non-200 is surfaced, never papered over with invented payloads.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tracing::warn;

use super::model::{CurrentlyPlaying, PlayRequest, Queue, RecentlyPlayed};
use crate::auth::TokenLifecycle;
use crate::{Error, Result};

const CURRENTLY_PLAYING_ENDPOINT: &str = "/me/player/currently-playing";
const QUEUE_ENDPOINT: &str = "/me/player/queue";
const RECENTLY_PLAYED_ENDPOINT: &str = "/me/player/recently-played";
const PLAY_ENDPOINT: &str = "/me/player/play";

/// Client for the player endpoints
pub struct SpotifyClient {
    /// HTTP client (timeout configured at construction)
    http: Client,
    /// API base URL
    base_url: String,
    /// Source of the bearer credential
    auth: Arc<TokenLifecycle>,
}

impl SpotifyClient {
    /// Create a client against the given API base URL
    #[must_use]
    pub fn new(http: Client, base_url: &str, auth: Arc<TokenLifecycle>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Bearer credential for the next call.
    fn bearer(&self) -> Result<String> {
        self.auth.access_token().ok_or(Error::Unauthenticated)
    }

    /// GET a player endpoint with the bearer credential attached.
    async fn get(&self, path_and_query: &str) -> Result<reqwest::Response> {
        let token = self.bearer()?;
        Ok(self
            .http
            .get(format!("{}{}", self.base_url, path_and_query))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Current playback snapshot. `Ok(None)` is the upstream 204: nothing is
    /// playing, which is an answer, not an error.
    pub async fn currently_playing(&self) -> Result<Option<CurrentlyPlaying>> {
        let response = self.get(CURRENTLY_PLAYING_ENDPOINT).await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::OK => response
                .json()
                .await
                .map(Some)
                .map_err(|e| Error::UpstreamDecode(e.to_string())),
            status => {
                warn!(endpoint = CURRENTLY_PLAYING_ENDPOINT, status = %status, "Unexpected upstream status");
                Err(Error::UpstreamStatus(status.as_u16()))
            }
        }
    }

    /// The play queue. A 204 (no active device) reads as an empty queue.
    pub async fn queue(&self) -> Result<Queue> {
        let response = self.get(QUEUE_ENDPOINT).await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(Queue::default()),
            StatusCode::OK => response
                .json()
                .await
                .map_err(|e| Error::UpstreamDecode(e.to_string())),
            status => {
                warn!(endpoint = QUEUE_ENDPOINT, status = %status, "Unexpected upstream status");
                Err(Error::UpstreamStatus(status.as_u16()))
            }
        }
    }

    /// Listening history, newest first, at most `limit` entries.
    pub async fn recently_played(&self, limit: usize) -> Result<RecentlyPlayed> {
        let response = self
            .get(&format!("{RECENTLY_PLAYED_ENDPOINT}?limit={limit}"))
            .await?;
        match response.status() {
            StatusCode::OK => response
                .json()
                .await
                .map_err(|e| Error::UpstreamDecode(e.to_string())),
            status => {
                warn!(endpoint = RECENTLY_PLAYED_ENDPOINT, status = %status, "Unexpected upstream status");
                Err(Error::UpstreamStatus(status.as_u16()))
            }
        }
    }

    /// Start or resume playback. The player answers 204 on success.
    pub async fn play(&self, request: &PlayRequest) -> Result<()> {
        let token = self.bearer()?;
        let response = self
            .http
            .put(format!("{}{}", self.base_url, PLAY_ENDPOINT))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            Ok(())
        } else {
            let status = response.status();
            warn!(endpoint = PLAY_ENDPOINT, status = %status, "Unexpected upstream status");
            Err(Error::UpstreamStatus(status.as_u16()))
        }
    }
}
