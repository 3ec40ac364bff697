//! Token lifecycle
//!
//! Owns the single live token and the pending authorization state. All
//! transitions swap whole records under one lock; readers either see the
//! previous token or the new one, never a half-written hybrid.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::RwLock;
use rand::RngExt;
use tracing::{info, warn};
use url::Url;

use super::exchange::{ClientCredentials, TokenEndpoint};
use super::store::TokenStore;
use super::token::Token;
use crate::{Error, Result};

/// The OAuth session for the one user this service fronts
pub struct TokenLifecycle {
    /// Token endpoint for both grants
    endpoint: TokenEndpoint,

    /// Application credentials
    credentials: ClientCredentials,

    /// Authorization endpoint the browser is sent to
    authorize_url: String,

    /// Redirect URI registered with the provider
    redirect_uri: String,

    /// Space-joined scopes requested during authorization
    scope: String,

    /// Persistence for the credential record
    store: TokenStore,

    /// Live token (whole-record swaps only)
    token: RwLock<Option<Token>>,

    /// State issued by the most recent begin_authorization call
    pending_state: RwLock<Option<String>>,
}

impl TokenLifecycle {
    /// Create a lifecycle for the given provider endpoints.
    ///
    /// `redirect_base` is the externally reachable base URL of this service;
    /// the provider redirects to `{redirect_base}/callback`.
    #[must_use]
    pub fn new(
        endpoint: TokenEndpoint,
        credentials: ClientCredentials,
        authorize_url: String,
        redirect_base: &str,
        scope: String,
        store: TokenStore,
    ) -> Self {
        Self {
            endpoint,
            credentials,
            authorize_url,
            redirect_uri: format!("{}/callback", redirect_base.trim_end_matches('/')),
            scope,
            store,
            token: RwLock::new(None),
            pending_state: RwLock::new(None),
        }
    }

    /// A live, unexpired token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().as_ref().is_some_and(|t| !t.is_expired())
    }

    /// A token is held but past its expiry instant.
    ///
    /// False when no token is held at all - "expired" describes a session
    /// that existed, not one that never did.
    pub fn is_expired(&self) -> bool {
        self.token.read().as_ref().is_some_and(Token::is_expired)
    }

    /// Bearer credential for upstream calls, if a token is held.
    pub fn access_token(&self) -> Option<String> {
        self.token.read().as_ref().map(|t| t.access_token.clone())
    }

    /// Adopt the persisted record, if any. Called once at startup.
    ///
    /// An expired record is adopted too: its refresh token is what lets the
    /// session recover without a browser round-trip.
    pub fn load_persisted(&self) {
        if let Some(token) = self.store.load() {
            *self.token.write() = Some(token);
        }
    }

    /// Start a browser authorization round: issue a fresh state value and
    /// build the consent URL.
    ///
    /// Each call supersedes the previous pending state; only the most recent
    /// one is accepted on callback.
    pub fn begin_authorization(&self) -> Result<String> {
        let state = generate_state();
        *self.pending_state.write() = Some(state.clone());

        let mut url = Url::parse(&self.authorize_url)
            .map_err(|e| Error::Config(format!("Invalid authorize URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", &state)
            .append_pair("scope", &self.scope);

        Ok(url.to_string())
    }

    /// Finish the authorization round: verify the callback state, exchange
    /// the code, and adopt the resulting token.
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<()> {
        if !self.take_matching_state(state) {
            warn!("Callback state does not match the issued state");
            return Err(Error::StateMismatch);
        }

        if !self.credentials.is_configured() {
            return Err(Error::MissingClientCredentials);
        }

        let response = self
            .endpoint
            .exchange_code(code, &self.redirect_uri, &self.credentials)
            .await?;

        let token = Token::from_response(response);
        let preview: String = token.access_token.chars().take(8).collect();
        info!(token_prefix = %preview, expires_at = %token.expires_at(), "Completed authorization");
        self.install(token);
        Ok(())
    }

    /// Replace the held token via the refresh grant.
    ///
    /// When the response omits a refresh token, the previous one is carried
    /// forward so the session can keep refreshing.
    pub async fn refresh(&self) -> Result<()> {
        let previous = {
            let guard = self.token.read();
            match guard.as_ref() {
                Some(token) => token.refresh_token().map(str::to_owned),
                None => return Err(Error::NoTokenToRefresh),
            }
        };

        // A held token without a refresh token still goes upstream; the
        // provider rejects the empty grant and the caller sees RefreshFailed.
        let response = self
            .endpoint
            .refresh(previous.as_deref().unwrap_or_default(), &self.credentials)
            .await?;

        let mut token = Token::from_response(response);
        if token.refresh_token().is_none() {
            token.refresh_token = previous;
        }

        info!(expires_at = %token.expires_at(), "Refreshed access token");
        self.install(token);
        Ok(())
    }

    /// Consume the pending state iff it matches; a mismatching presentation
    /// leaves the pending state in place so a stray hit cannot cancel a
    /// legitimate in-flight authorization.
    fn take_matching_state(&self, presented: &str) -> bool {
        let mut pending = self.pending_state.write();
        match pending.as_deref() {
            Some(expected) if expected == presented => {
                *pending = None;
                true
            }
            _ => false,
        }
    }

    /// Persist and publish a freshly adopted record. Persistence failures
    /// are logged, not fatal: the in-memory session keeps working.
    fn install(&self, token: Token) {
        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "Failed to persist credentials");
        }
        *self.token.write() = Some(token);
    }
}

/// Generate a random state parameter (16 bytes, base64url)
fn generate_state() -> String {
    let state_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(state_bytes)
}
