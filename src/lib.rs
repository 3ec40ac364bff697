//! nowplaying - self-hosted now-playing facade for the Spotify Web API
//!
//! Fronts the Spotify player endpoints for a single user so a personal
//! website can poll "what am I listening to" without ever seeing tokens.
//!
//! # What it does
//!
//! - **OAuth session**: Authorization Code flow, transparent refresh,
//!   credentials persisted across restarts
//! - **Serve-stale caching**: one slot per resource; callers get the last
//!   known answer immediately while a detached fetch updates it behind them
//! - **Small polling surface**: `/current`, `/queue`, `/recent`, `/play`
//!   plus the login/callback/refresh plumbing

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod spotify;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
