//! Token persistence
//!
//! Persists the credential record to disk so an authorized session survives
//! service restarts without another browser round-trip.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::token::Token;
use crate::{Error, Result};

/// On-disk storage for the credential record
pub struct TokenStore {
    /// Full path of the credential file
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by the given file path
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default credential file location under the OS cache directory
    /// (`{cache_dir}/nowplaying/credentials.json`).
    pub fn default_path() -> Result<PathBuf> {
        let cache = dirs::cache_dir()
            .ok_or_else(|| Error::Config("Cannot determine cache directory".to_string()))?;
        Ok(cache.join("nowplaying").join("credentials.json"))
    }

    /// Where this store reads and writes
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the persisted record, if one exists and parses.
    ///
    /// A missing file is the normal first-run case. Unreadable or corrupt
    /// files are logged and treated as absent; the service starts
    /// unauthenticated rather than refusing to boot. An expired record is
    /// still returned - its refresh token is what lets the session recover.
    pub fn load(&self) -> Option<Token> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No stored credentials found");
            return None;
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Token>(&content) {
                Ok(token) => {
                    if token.is_expired() {
                        debug!("Stored token is expired, keeping it for refresh");
                    } else {
                        info!(expires_at = %token.expires_at(), "Loaded valid stored token");
                    }
                    Some(token)
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse stored credentials");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to read credential file");
                None
            }
        }
    }

    /// Persist the record, creating parent directories as needed.
    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, content)?;

        // Restrictive permissions (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        info!(path = %self.path.display(), "Saved credentials");
        Ok(())
    }
}
