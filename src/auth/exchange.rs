//! Token-endpoint wire protocol
//!
//! Form-encoded POSTs for the two grants this service uses, and the decoded
//! response shape. Callers adopt the response into a [`super::Token`] record;
//! nothing here stamps time or touches shared state.

use reqwest::Client;
use serde::Deserialize;

use crate::{Error, Result};

/// OAuth application credentials
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Registered application id
    pub client_id: String,
    /// Registered application secret
    pub client_secret: String,
}

impl ClientCredentials {
    /// Create credentials from already-resolved values
    #[must_use]
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// Both halves present?
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Token endpoint response as it comes off the wire.
///
/// Deliberately has no issuance time: that is stamped locally on adoption.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Replacement refresh token; refresh responses routinely omit this
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// A configured token endpoint
pub struct TokenEndpoint {
    /// HTTP client for token requests
    http: Client,
    /// Token endpoint URL
    url: String,
}

impl TokenEndpoint {
    /// Create an endpoint handle
    #[must_use]
    pub fn new(http: Client, url: String) -> Self {
        Self { http, url }
    }

    /// Exchange an authorization code for a token.
    ///
    /// The `redirect_uri` must byte-match the one sent on the authorize
    /// request or the provider rejects the grant.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        credentials: &ClientCredentials,
    ) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &credentials.client_id),
            ("client_secret", &credentials.client_secret),
        ];

        let response = self
            .http
            .post(&self.url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::ExchangeFailed(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExchangeFailed(format!("HTTP {status} - {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::ExchangeFailed(format!("invalid token response: {e}")))
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        credentials: &ClientCredentials,
    ) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &credentials.client_id),
            ("client_secret", &credentials.client_secret),
        ];

        let response = self
            .http
            .post(&self.url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::RefreshFailed(format!("refresh request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RefreshFailed(format!("HTTP {status} - {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::RefreshFailed(format!("invalid refresh response: {e}")))?;

        // A 200 with no usable access token must not replace a working one.
        if token.access_token.is_empty() {
            return Err(Error::RefreshFailed(
                "response contained an empty access token".to_string(),
            ));
        }

        Ok(token)
    }
}
