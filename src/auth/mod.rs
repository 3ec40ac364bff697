//! OAuth 2.0 token lifecycle
//!
//! Implements the Authorization Code flow against the Spotify accounts
//! service for a single user, plus everything needed to keep that user's
//! session alive across restarts.
//!
//! Pieces:
//! - Token record with locally stamped issuance time
//! - On-disk persistence (restrictive permissions, cache directory)
//! - Token-endpoint wire protocol (code exchange and refresh grants)
//! - Lifecycle state machine (begin/complete authorization, refresh)
//! - Request gate middleware for the resource routes

mod exchange;
mod gate;
mod lifecycle;
mod store;
mod token;

pub use exchange::{ClientCredentials, TokenEndpoint, TokenResponse};
pub use gate::require_auth;
pub use lifecycle::TokenLifecycle;
pub use store::TokenStore;
pub use token::Token;
