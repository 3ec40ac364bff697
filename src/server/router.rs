//! HTTP router and handlers
//!
//! The resource handlers all follow the same serve-stale-then-refresh shape:
//! answer from the cache slot immediately when it is occupied, and kick off a
//! detached refresh that publishes behind the response. Only a never-filled
//! slot (or an explicit bypass on /queue) makes a caller wait for upstream.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{ClientCredentials, TokenEndpoint, TokenLifecycle, TokenStore, require_auth};
use crate::cache::ResponseCache;
use crate::config::{Config, CorsConfig};
use crate::spotify::{CurrentlyPlaying, PlayRequest, Queue, RecentlyPlayed, SpotifyClient};
use crate::{Error, Result};

/// Entries returned by the list routes when no limit is given
const DEFAULT_LIMIT: usize = 5;
/// Hard cap for `limit`; also the window fetched upstream for /recent
const MAX_LIMIT: usize = 15;

/// Per-resource cache slots
#[derive(Default)]
pub struct ResourceCaches {
    /// /current slot; a published `None` is the upstream "nothing playing"
    pub current: ResponseCache<Option<CurrentlyPlaying>>,
    /// /queue slot
    pub queue: ResponseCache<Queue>,
    /// /recent slot, always holding the full capped window
    pub recent: ResponseCache<RecentlyPlayed>,
}

/// Shared application state
pub struct AppState {
    /// Token lifecycle for the one configured user
    pub auth: Arc<TokenLifecycle>,
    /// Authenticated upstream client
    pub spotify: SpotifyClient,
    /// Per-resource response caches
    pub caches: ResourceCaches,
}

impl AppState {
    /// Wire lifecycle, upstream client and caches from configuration.
    /// Persisted credentials are adopted here, as part of startup.
    pub fn from_config(config: &Config) -> Result<Arc<Self>> {
        let http = Client::builder().timeout(config.upstream.timeout).build()?;

        let credentials = ClientCredentials::new(
            config.spotify.resolved_client_id(),
            config.spotify.resolved_client_secret(),
        );
        let credentials_path = match &config.storage.credentials_path {
            Some(path) => path.clone(),
            None => TokenStore::default_path()?,
        };

        let auth = Arc::new(TokenLifecycle::new(
            TokenEndpoint::new(http.clone(), config.spotify.token_url.clone()),
            credentials,
            config.spotify.auth_url.clone(),
            &config.server.public_url(),
            config.spotify.scope(),
            TokenStore::new(credentials_path),
        ));
        auth.load_persisted();

        let spotify = SpotifyClient::new(http, &config.spotify.api_url, Arc::clone(&auth));

        Ok(Arc::new(Self {
            auth,
            spotify,
            caches: ResourceCaches::default(),
        }))
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    let playback = Router::new()
        .route("/current", get(current_handler))
        .route("/queue", get(queue_handler))
        .route("/recent", get(recent_handler))
        .route("/play", put(play_handler))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth),
            require_auth,
        ));

    Router::new()
        .route("/", get(login_handler))
        .route("/callback", get(callback_handler))
        .route("/refresh", post(refresh_handler))
        .route("/health", get(health_handler))
        .merge(playback)
        .layer(cors_layer(cors))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the CORS layer from configured origins.
/// No origins means no CORS headers at all.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// GET / - send the browser to the provider's consent page
async fn login_handler(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let url = state.auth.begin_authorization()?;
    Ok(Redirect::temporary(&url))
}

/// Query parameters of the provider redirect
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /callback - provider redirect target
async fn callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    if let Some(denial) = params.error {
        let description = params.error_description.unwrap_or_default();
        warn!(error = %denial, description = %description, "Provider denied authorization");
        return Err(Error::ExchangeFailed(format!("provider returned {denial}")));
    }

    let callback_state = params.state.ok_or(Error::StateMismatch)?;
    let code = params
        .code
        .ok_or_else(|| Error::InvalidParameter("missing authorization code".to_string()))?;

    state
        .auth
        .complete_authorization(&code, &callback_state)
        .await?;

    Ok(Redirect::temporary("/current"))
}

/// POST /refresh - force a refresh round, surfacing the outcome
async fn refresh_handler(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.auth.refresh().await?;
    Ok(StatusCode::OK)
}

/// GET /health - liveness plus session status
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "authenticated": state.auth.is_authenticated(),
    }))
}

/// GET /current - what is playing right now
async fn current_handler(State(state): State<Arc<AppState>>) -> Result<Response> {
    if let Some(cached) = state.caches.current.load() {
        refresh_current_behind(Arc::clone(&state));
        return Ok(render_current(&cached));
    }

    let fresh = state.spotify.currently_playing().await?;
    let published = state.caches.current.publish(fresh);
    Ok(render_current(&published))
}

/// A published `None` is the upstream's own "nothing playing": serve 204,
/// without inventing a body.
fn render_current(snapshot: &Option<CurrentlyPlaying>) -> Response {
    match snapshot {
        Some(playing) => Json(playing).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Query parameters of /queue
#[derive(Debug, Deserialize)]
struct QueueParams {
    limit: Option<usize>,
    /// Presence alone bypasses the cache; the value is ignored
    #[serde(rename = "skip-cache")]
    skip_cache: Option<String>,
}

/// GET /queue - upcoming tracks
async fn queue_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueueParams>,
) -> Result<Json<Queue>> {
    let limit = effective_limit(params.limit)?;

    if params.skip_cache.is_none() {
        if let Some(cached) = state.caches.queue.load() {
            refresh_queue_behind(Arc::clone(&state));
            return Ok(Json(truncated_queue(&cached, limit)));
        }
    }

    let fresh = state.spotify.queue().await?;
    let published = state.caches.queue.publish(fresh);
    Ok(Json(truncated_queue(&published, limit)))
}

/// Query parameters of /recent
#[derive(Debug, Deserialize)]
struct RecentParams {
    limit: Option<usize>,
}

/// GET /recent - listening history
///
/// Upstream is always asked for the full capped window; the requested limit
/// only truncates the served copy. One cached fetch answers any in-range
/// limit without another upstream call.
async fn recent_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<RecentlyPlayed>> {
    let limit = effective_limit(params.limit)?;

    if let Some(cached) = state.caches.recent.load() {
        refresh_recent_behind(Arc::clone(&state));
        return Ok(Json(truncated_recent(&cached, limit)));
    }

    let fresh = state.spotify.recently_played(MAX_LIMIT).await?;
    let published = state.caches.recent.publish(fresh);
    Ok(Json(truncated_recent(&published, limit)))
}

/// PUT /play - start or resume playback
async fn play_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlayRequest>,
) -> Result<StatusCode> {
    state.spotify.play(&request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Detached refresh of the /current slot. Failures are logged, never served.
fn refresh_current_behind(state: Arc<AppState>) {
    tokio::spawn(async move {
        match state.spotify.currently_playing().await {
            Ok(snapshot) => {
                state.caches.current.publish(snapshot);
            }
            Err(e) => warn!(error = %e, "Background refresh of /current failed"),
        }
    });
}

/// Detached refresh of the /queue slot.
fn refresh_queue_behind(state: Arc<AppState>) {
    tokio::spawn(async move {
        match state.spotify.queue().await {
            Ok(queue) => {
                state.caches.queue.publish(queue);
            }
            Err(e) => warn!(error = %e, "Background refresh of /queue failed"),
        }
    });
}

/// Detached refresh of the /recent slot (full capped window).
fn refresh_recent_behind(state: Arc<AppState>) {
    tokio::spawn(async move {
        match state.spotify.recently_played(MAX_LIMIT).await {
            Ok(recent) => {
                state.caches.recent.publish(recent);
            }
            Err(e) => warn!(error = %e, "Background refresh of /recent failed"),
        }
    });
}

/// Validate the limit parameter: absent means the default, anything outside
/// `[1, MAX_LIMIT]` is the caller's mistake.
fn effective_limit(raw: Option<usize>) -> Result<usize> {
    match raw {
        None => Ok(DEFAULT_LIMIT),
        Some(n) if (1..=MAX_LIMIT).contains(&n) => Ok(n),
        Some(n) => Err(Error::InvalidParameter(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {n}"
        ))),
    }
}

/// Clone out the first `limit` queue entries.
fn truncated_queue(full: &Queue, limit: usize) -> Queue {
    Queue {
        queue: full.queue.iter().take(limit).cloned().collect(),
    }
}

/// Clone out the first `limit` history entries.
fn truncated_recent(full: &RecentlyPlayed, limit: usize) -> RecentlyPlayed {
    RecentlyPlayed {
        items: full.items.iter().take(limit).cloned().collect(),
    }
}
