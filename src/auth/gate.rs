//! Request gate for resource routes
//!
//! Every playback route passes through here. A live session goes straight
//! through; an expired one gets a single transparent refresh attempt; no
//! session at all is a 401. Clients never see a half-recovered state: either
//! the refresh succeeded and the request proceeds with the new token, or the
//! failure is surfaced as-is.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::lifecycle::TokenLifecycle;
use crate::Error;

/// Middleware guarding the playback routes.
pub async fn require_auth(
    State(auth): State<Arc<TokenLifecycle>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if auth.is_authenticated() {
        return next.run(request).await;
    }

    if auth.is_expired() {
        match auth.refresh().await {
            Ok(()) => next.run(request).await,
            Err(e) => {
                warn!(path = %request.uri().path(), error = %e, "Transparent refresh failed");
                e.into_response()
            }
        }
    } else {
        debug!(path = %request.uri().path(), "Request without an authenticated session");
        Error::Unauthenticated.into_response()
    }
}
