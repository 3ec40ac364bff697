//! Configuration management

use std::{env, path::Path, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before serving.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    /// Variables are set into the process environment for `env:VAR` resolution.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Spotify application and endpoint configuration
    pub spotify: SpotifyConfig,
    /// Upstream HTTP client configuration
    pub upstream: UpstreamConfig,
    /// Cross-origin access for browser clients
    pub cors: CorsConfig,
    /// Token persistence configuration
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Externally reachable base URL, used to build the OAuth redirect URI.
    /// Defaults to `http://{host}:{port}` which only works for local use.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5050,
            public_url: None,
        }
    }
}

impl ServerConfig {
    /// Base URL the provider redirects back to after consent.
    #[must_use]
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }
}

/// Spotify application and endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    /// OAuth client id (supports `env:VAR_NAME` indirection)
    pub client_id: String,
    /// OAuth client secret (supports `env:VAR_NAME` indirection)
    pub client_secret: String,
    /// Authorization endpoint the browser is sent to
    pub auth_url: String,
    /// Token endpoint for code exchange and refresh
    pub token_url: String,
    /// Web API base URL
    pub api_url: String,
    /// Scopes requested during authorization
    pub scopes: Vec<String>,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_url: "https://api.spotify.com/v1".to_string(),
            scopes: vec![
                "user-read-currently-playing".to_string(),
                "user-read-playback-state".to_string(),
                "user-modify-playback-state".to_string(),
                "user-read-recently-played".to_string(),
            ],
        }
    }
}

impl SpotifyConfig {
    /// Resolve the client id (expand `env:VAR_NAME`)
    #[must_use]
    pub fn resolved_client_id(&self) -> String {
        resolve_env_ref(&self.client_id)
    }

    /// Resolve the client secret (expand `env:VAR_NAME`)
    #[must_use]
    pub fn resolved_client_secret(&self) -> String {
        resolve_env_ref(&self.client_secret)
    }

    /// Space-joined scope string as the authorize endpoint expects it.
    #[must_use]
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Resolve an `env:VAR_NAME` reference against the process environment.
/// Literal values (and unset variables) pass through unchanged.
fn resolve_env_ref(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix("env:") {
        env::var(var_name).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Upstream HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-request timeout for calls to the provider
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Cross-origin access configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the service from a browser.
    /// Empty means no CORS headers are emitted.
    pub allowed_origins: Vec<String>,
}

/// Token persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the credential file lives. Defaults to
    /// `{cache_dir}/nowplaying/credentials.json`.
    pub credentials_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (NOWPLAYING_ prefix)
        figment = figment.merge(Env::prefixed("NOWPLAYING_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Load env files into the process environment so that `env:VAR`
        // references resolve when credentials are first read.
        config.load_env_files();

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" must be checked before the bare "s" suffix.
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            // Assume seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
