//! Error types for the now-playing service

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Error, Debug)]
pub enum Error {
    /// Client id/secret missing or unresolved
    #[error("Spotify client credentials are not configured")]
    MissingClientCredentials,

    /// Callback state did not match the one we issued
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Authorization-code exchange failed at the token endpoint
    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    /// Refresh requested while no token is held
    #[error("No token available to refresh")]
    NoTokenToRefresh,

    /// Refresh grant rejected or returned an unusable token
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Resource route hit without a usable token
    #[error("Not authenticated")]
    Unauthenticated,

    /// Upstream API answered with a status we do not handle
    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    /// Upstream API answered 200 with a body we could not decode
    #[error("Upstream response decode failed: {0}")]
    UpstreamDecode(String),

    /// Caller-supplied parameter out of range or malformed
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// HTTP status this error maps to when it reaches a handler boundary.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::StateMismatch | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::UpstreamStatus(_) | Self::UpstreamDecode(_) | Self::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(Error::StateMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::InvalidParameter("limit".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::UpstreamStatus(503).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            Error::UpstreamDecode("eof".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::MissingClientCredentials.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::RefreshFailed("denied".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_is_error_json() {
        let body = json!({ "error": Error::Unauthenticated.to_string() });
        assert_eq!(body["error"], "Not authenticated");
    }
}
