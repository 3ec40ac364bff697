//! End-to-end API tests
//!
//! Boots the full router on a real listener, with a mock provider standing
//! in for both the token endpoint and the Web API:
//! - authentication gating and transparent refresh
//! - the browser login round
//! - serve-stale caching, cache bypass, and limit validation

use chrono::{Duration, Utc};
use nowplaying::auth::{Token, TokenStore};
use nowplaying::config::{Config, SpotifyConfig, StorageConfig};
use nowplaying::server::{AppState, create_router};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A running service instance wired against its own mock provider
struct TestApp {
    base: String,
    client: reqwest::Client,
    provider: MockServer,
    _dir: TempDir,
}

impl TestApp {
    async fn get(&self, path_and_query: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path_and_query))
            .send()
            .await
            .unwrap()
    }
}

/// Boot the service against a fresh mock provider, optionally seeding a
/// persisted credential record first
async fn spawn_app(seed: Option<&Token>) -> TestApp {
    let provider = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let credentials_path = dir.path().join("credentials.json");
    if let Some(token) = seed {
        TokenStore::new(credentials_path.clone())
            .save(token)
            .unwrap();
    }

    let config = Config {
        spotify: SpotifyConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            auth_url: format!("{}/authorize", provider.uri()),
            token_url: format!("{}/api/token", provider.uri()),
            api_url: format!("{}/v1", provider.uri()),
            ..SpotifyConfig::default()
        },
        storage: StorageConfig {
            credentials_path: Some(credentials_path),
        },
        ..Config::default()
    };

    let state = AppState::from_config(&config).unwrap();
    let router = create_router(state, &config.cors);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Redirects stay visible: the login round is asserted hop by hop.
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        base,
        client,
        provider,
        _dir: dir,
    }
}

/// A live credential record
fn valid_token() -> Token {
    Token {
        access_token: "access-live".to_string(),
        token_type: "Bearer".to_string(),
        expires_in: 3600,
        refresh_token: Some("refresh-1".to_string()),
        scope: String::new(),
        created_at: Utc::now(),
    }
}

/// A credential record past its expiry but still holding a refresh token
fn expired_token() -> Token {
    Token {
        created_at: Utc::now() - Duration::hours(2),
        access_token: "access-stale".to_string(),
        ..valid_token()
    }
}

/// Currently-playing payload with the given track name
fn playing_body(name: &str) -> serde_json::Value {
    json!({
        "timestamp": 1_756_100_000_000_u64,
        "progress_ms": 12_000,
        "is_playing": true,
        "currently_playing_type": "track",
        "item": {"name": name, "uri": "spotify:track:1", "duration_ms": 180_000}
    })
}

/// Queue payload with the given track names
fn queue_body(names: &[&str]) -> serde_json::Value {
    let queue: Vec<serde_json::Value> = names.iter().map(|n| json!({"name": n})).collect();
    json!({"queue": queue})
}

/// History payload with `n` entries named recent-0..recent-n
fn recent_body(n: usize) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            json!({
                "track": {"name": format!("recent-{i}")},
                "played_at": "2026-08-25T10:00:00Z"
            })
        })
        .collect();
    json!({"items": items})
}

/// Test that /health answers without authentication and reports the
/// session state
#[tokio::test]
async fn test_health_is_public_and_reports_session() {
    let app = spawn_app(None).await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["authenticated"], false);
}

/// Test that every playback route rejects unauthenticated callers with a
/// JSON error body
#[tokio::test]
async fn test_playback_routes_require_authentication() {
    let app = spawn_app(None).await;

    for route in ["/current", "/queue", "/recent"] {
        let response = app.get(route).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{route}");
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Not authenticated", "{route}");
    }

    let response = app
        .client
        .put(format!("{}/play", app.base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Test that the login route redirects to the provider's consent page with
/// the full OAuth parameter set
#[tokio::test]
async fn test_login_redirects_to_consent_page() {
    let app = spawn_app(None).await;

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let location = response.headers()[reqwest::header::LOCATION]
        .to_str()
        .unwrap()
        .to_string();
    let consent = url::Url::parse(&location).unwrap();
    assert!(location.starts_with(&format!("{}/authorize", app.provider.uri())));

    let params: std::collections::HashMap<String, String> = consent
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["client_id"], "client-id");
    assert_eq!(params["redirect_uri"], "http://127.0.0.1:5050/callback");
    assert!(!params["state"].is_empty());
    assert_eq!(
        params["scope"],
        "user-read-currently-playing user-read-playback-state \
         user-modify-playback-state user-read-recently-played"
    );
}

/// Test that a callback carrying a state the service never issued is
/// rejected before any exchange
#[tokio::test]
async fn test_callback_with_wrong_state_is_rejected() {
    let app = spawn_app(None).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.provider)
        .await;

    // Issue a genuine state, then present a different one.
    app.get("/").await;
    let response = app.get("/callback?code=auth-code-1&state=forged").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "OAuth state mismatch");
}

/// Test the full browser round: login redirect, callback with the issued
/// state, session established, playback route reachable with the new bearer
#[tokio::test]
async fn test_browser_round_authenticates_the_session() {
    let app = spawn_app(None).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "scope": ""
        })))
        .expect(1)
        .mount(&app.provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&app.provider)
        .await;

    let login = app.get("/").await;
    let location = login.headers()[reqwest::header::LOCATION].to_str().unwrap();
    let state = url::Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let callback = app
        .get(&format!("/callback?code=auth-code-1&state={state}"))
        .await;
    assert_eq!(callback.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(callback.headers()[reqwest::header::LOCATION], "/current");

    let health: serde_json::Value = app.get("/health").await.json().await.unwrap();
    assert_eq!(health["authenticated"], true);

    // The adopted bearer flows through to the upstream call.
    let current = app.get("/current").await;
    assert_eq!(current.status(), StatusCode::NO_CONTENT);
}

/// Test that a consent-page denial from the provider is surfaced, not
/// treated as a missing parameter
#[tokio::test]
async fn test_provider_denial_is_surfaced() {
    let app = spawn_app(None).await;

    let response = app
        .get("/callback?error=access_denied&error_description=User%20said%20no")
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("access_denied"), "{message}");
}

/// Test that a persisted credential record authenticates the session at
/// boot, with no browser round
#[tokio::test]
async fn test_persisted_session_survives_restart() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;

    let health: serde_json::Value = app.get("/health").await.json().await.unwrap();
    assert_eq!(health["authenticated"], true);
}

/// Test that an upstream "nothing playing" is served as 204, and that the
/// published empty marker answers later polls from cache
#[tokio::test]
async fn test_current_serves_upstream_nothing_as_204() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .respond_with(ResponseTemplate::new(204))
        .up_to_n_times(1)
        .mount(&app.provider)
        .await;

    let first = app.get("/current").await;
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    // The provider no longer answers; the cached empty marker does.
    let second = app.get("/current").await;
    assert_eq!(second.status(), StatusCode::NO_CONTENT);
}

/// Test that an ad-break snapshot (null item) is served as-is instead of
/// failing the fetch
#[tokio::test]
async fn test_current_serves_ad_break_snapshots() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timestamp": 1_756_100_000_000_u64,
            "progress_ms": 4_000,
            "is_playing": true,
            "currently_playing_type": "ad",
            "item": null
        })))
        .mount(&app.provider)
        .await;

    let response = app.get("/current").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["item"].is_null());
    assert_eq!(body["currently_playing_type"], "ad");
}

/// Test the serve-stale contract on /current: a poll is answered from the
/// snapshot while the refresh lands behind it
#[tokio::test]
async fn test_current_serves_stale_then_updates_behind() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(playing_body("First")))
        .up_to_n_times(1)
        .mount(&app.provider)
        .await;

    let first: serde_json::Value = app.get("/current").await.json().await.unwrap();
    assert_eq!(first["item"]["name"], "First");

    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(playing_body("Second")))
        .mount(&app.provider)
        .await;

    // The snapshot answers immediately even though upstream moved on.
    let stale: serde_json::Value = app.get("/current").await.json().await.unwrap();
    assert_eq!(stale["item"]["name"], "First");

    // The detached refresh publishes the new snapshot shortly after.
    for attempt in 0..100 {
        let body: serde_json::Value = app.get("/current").await.json().await.unwrap();
        if body["item"]["name"] == "Second" {
            return;
        }
        assert!(attempt < 99, "refresh never published the new snapshot");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

/// Test limit validation and truncation on /queue
#[tokio::test]
async fn test_queue_limit_validation_and_truncation() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;
    let names: Vec<String> = (0..12).map(|i| format!("queued-{i}")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    Mock::given(method("GET"))
        .and(path("/v1/me/player/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&name_refs)))
        .mount(&app.provider)
        .await;

    // Out-of-range limits are the caller's mistake.
    for query in ["/queue?limit=0", "/queue?limit=20"] {
        let response = app.get(query).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(
            body["error"].as_str().unwrap().contains("limit"),
            "{query}"
        );
    }

    // Default window.
    let body: serde_json::Value = app.get("/queue").await.json().await.unwrap();
    let queue = body["queue"].as_array().unwrap();
    assert_eq!(queue.len(), 5);
    assert_eq!(queue[0]["name"], "queued-0");
    assert_eq!(queue[4]["name"], "queued-4");

    // Explicit in-range limit.
    let body: serde_json::Value = app.get("/queue?limit=9").await.json().await.unwrap();
    assert_eq!(body["queue"].as_array().unwrap().len(), 9);

    // A limit beyond what upstream holds serves what exists.
    let body: serde_json::Value = app.get("/queue?limit=15").await.json().await.unwrap();
    assert_eq!(body["queue"].as_array().unwrap().len(), 12);
}

/// Test that skip-cache forces a synchronous upstream round and republishes
#[tokio::test]
async fn test_queue_skip_cache_bypasses_the_snapshot() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&["old-a", "old-b"])))
        .up_to_n_times(1)
        .mount(&app.provider)
        .await;

    let body: serde_json::Value = app.get("/queue").await.json().await.unwrap();
    assert_eq!(body["queue"][0]["name"], "old-a");

    Mock::given(method("GET"))
        .and(path("/v1/me/player/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&["new-a", "new-b"])))
        .mount(&app.provider)
        .await;

    // Presence of the flag alone is enough; no value needed.
    let body: serde_json::Value = app.get("/queue?skip-cache").await.json().await.unwrap();
    assert_eq!(body["queue"][0]["name"], "new-a");

    // The bypass round replaced the snapshot for everyone.
    let body: serde_json::Value = app.get("/queue").await.json().await.unwrap();
    assert_eq!(body["queue"][0]["name"], "new-a");
}

/// Test that /recent always fetches the full capped window upstream and
/// serves any in-range limit from that one snapshot
#[tokio::test]
async fn test_recent_serves_limits_from_one_cached_window() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/recently-played"))
        .and(query_param("limit", "15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(recent_body(12)))
        .up_to_n_times(1)
        .mount(&app.provider)
        .await;

    let body: serde_json::Value = app.get("/recent").await.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[0]["track"]["name"], "recent-0");

    // A wider limit is answered from the same cached window; the provider
    // is not asked again (the mock above only matches once).
    let body: serde_json::Value = app.get("/recent?limit=10").await.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 10);

    let response = app.get("/recent?limit=16").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Test that POST /refresh recovers an expired session on the spot
#[tokio::test]
async fn test_refresh_endpoint_recovers_expired_session() {
    let token = expired_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-fresh",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": ""
        })))
        .expect(1)
        .mount(&app.provider)
        .await;

    let health: serde_json::Value = app.get("/health").await.json().await.unwrap();
    assert_eq!(health["authenticated"], false);

    let response = app
        .client
        .post(format!("{}/refresh", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: serde_json::Value = app.get("/health").await.json().await.unwrap();
    assert_eq!(health["authenticated"], true);
}

/// Test that a provider failure during POST /refresh is surfaced to the
/// caller instead of silently keeping the stale session
#[tokio::test]
async fn test_refresh_endpoint_surfaces_provider_failure() {
    let token = expired_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("provider down"))
        .mount(&app.provider)
        .await;

    let response = app
        .client
        .post(format!("{}/refresh", app.base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Token refresh failed"), "{message}");

    // The stale session stays stale; nothing pretended to recover.
    let health: serde_json::Value = app.get("/health").await.json().await.unwrap();
    assert_eq!(health["authenticated"], false);
}

/// Test that POST /refresh with no session at all reports the local error
#[tokio::test]
async fn test_refresh_endpoint_without_session_is_an_error() {
    let app = spawn_app(None).await;

    let response = app
        .client
        .post(format!("{}/refresh", app.base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No token available to refresh");
}

/// Test that the gate refreshes an expired session transparently: the
/// caller sees the resource, never a 401
#[tokio::test]
async fn test_gate_refreshes_expired_session_transparently() {
    let token = expired_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-fresh",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": ""
        })))
        .expect(1)
        .mount(&app.provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .and(header("authorization", "Bearer access-fresh"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&app.provider)
        .await;

    let response = app.get("/current").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

/// Test that a failed transparent refresh on a gated route surfaces as a
/// server error, not a 401, and the request never reaches the resource
#[tokio::test]
async fn test_gate_surfaces_refresh_failure_as_server_error() {
    let token = expired_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("provider down"))
        .expect(1)
        .mount(&app.provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&app.provider)
        .await;

    let response = app.get("/current").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Token refresh failed"), "{message}");

    // The stale session is still there, unrecovered.
    let health: serde_json::Value = app.get("/health").await.json().await.unwrap();
    assert_eq!(health["authenticated"], false);
}

/// Test that PUT /play forwards the request body and relays success
#[tokio::test]
async fn test_play_forwards_request_and_returns_no_content() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/play"))
        .and(body_partial_json(json!({"uris": ["spotify:track:1"]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.provider)
        .await;

    let response = app
        .client
        .put(format!("{}/play", app.base))
        .json(&json!({"uris": ["spotify:track:1"]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

/// Test that a player rejection of PUT /play maps to a gateway error
#[tokio::test]
async fn test_play_rejection_maps_to_bad_gateway() {
    let token = valid_token();
    let app = spawn_app(Some(&token)).await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/play"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Player command failed"))
        .mount(&app.provider)
        .await;

    let response = app
        .client
        .put(format!("{}/play", app.base))
        .json(&json!({"context_uri": "spotify:album:x"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Upstream returned status 403");
}
