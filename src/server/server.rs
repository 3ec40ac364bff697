//! Service startup and shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use super::router::{AppState, create_router};
use crate::auth::ClientCredentials;
use crate::config::Config;
use crate::{Error, Result};

/// The now-playing service
#[derive(Debug)]
pub struct Server {
    /// Configuration
    config: Config,
}

impl Server {
    /// Validate configuration and create the server.
    ///
    /// Missing client credentials fail here, at boot, so the operator finds
    /// out immediately instead of at the first OAuth callback.
    pub fn new(config: Config) -> Result<Self> {
        let credentials = ClientCredentials::new(
            config.spotify.resolved_client_id(),
            config.spotify.resolved_client_secret(),
        );
        if !credentials.is_configured() {
            return Err(Error::MissingClientCredentials);
        }

        Ok(Self { config })
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let state = AppState::from_config(&self.config)?;
        let app = create_router(Arc::clone(&state), &self.config.cors);

        let listener = TcpListener::bind(addr).await?;

        info!(host = %self.config.server.host, port = self.config.server.port, "Listening");
        info!(redirect_base = %self.config.server.public_url(), "OAuth redirect base");
        if state.auth.is_authenticated() {
            info!("Resuming persisted session");
        } else if state.auth.is_expired() {
            info!("Persisted session is expired; will refresh on first request");
        } else {
            info!(
                login_url = %format!("{}/", self.config.server.public_url()),
                "Not authenticated - open the login URL to connect Spotify"
            );
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
