//! Token record
//!
//! The persisted shape of an OAuth token. The issuance time is stamped
//! locally when the wire response is adopted; it is never taken from the
//! provider, so expiry math works even against a misbehaving upstream.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::exchange::TokenResponse;

/// An issued OAuth token together with its locally stamped issuance time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Access token presented as the bearer credential upstream
    pub access_token: String,

    /// Token type (always "Bearer" in practice)
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime in seconds, relative to `created_at`
    pub expires_in: i64,

    /// Refresh token (optional; older credential files store "")
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Granted scopes
    #[serde(default)]
    pub scope: String,

    /// When this record was adopted locally
    pub created_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Adopt a token-endpoint response, stamping the issuance time now.
    #[must_use]
    pub fn from_response(resp: TokenResponse) -> Self {
        Self {
            access_token: resp.access_token,
            token_type: resp.token_type,
            expires_in: resp.expires_in,
            refresh_token: resp.refresh_token,
            scope: resp.scope,
            created_at: Utc::now(),
        }
    }

    /// Instant this token stops being usable. Lifetimes beyond the datetime
    /// range saturate at the bounds rather than overflowing.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        let bound = if self.expires_in < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        };
        Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| self.created_at.checked_add_signed(lifetime))
            .unwrap_or(bound)
    }

    /// Whether the expiry instant has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Refresh token, treating the empty string as absent.
    ///
    /// Credential files written by older deployments serialize a missing
    /// refresh token as `""`; both spellings mean "none".
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}
