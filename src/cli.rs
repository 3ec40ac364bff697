//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

/// Self-hosted now-playing facade for the Spotify Web API
#[derive(Parser, Debug)]
#[command(name = "nowplaying")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "NOWPLAYING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "NOWPLAYING_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "NOWPLAYING_HOST")]
    pub host: Option<String>,

    /// Externally reachable base URL, used for the OAuth redirect
    #[arg(long, env = "NOWPLAYING_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "NOWPLAYING_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "NOWPLAYING_LOG_FORMAT")]
    pub log_format: Option<String>,
}
