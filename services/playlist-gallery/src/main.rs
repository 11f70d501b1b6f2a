//! Playlist Gallery
//!
//! Single-binary Rust service that:
//! 1. Sends first-time visitors through Spotify's PKCE authorization flow
//! 2. Exchanges the returned code for an access token, once
//! 3. Fetches the user's profile and every page of their playlists
//! 4. Renders both as JSON, plus album art for a chosen playlist

mod config;
mod error;
mod metrics;
mod resources;
mod sessions;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use paging::{HttpTransport, PaginatedFetcher};
use pkce_auth::{
    AuthAction, AuthEvent, AuthRedirector, AuthState, CallbackOutcome, CallbackParams, FileStore,
    KeyValueStore, MemoryStore, OAuthClientConfig, Session, TokenExchanger, handle_event,
};

use crate::config::{ApiConfig, Config};
use crate::error::AppError;
use crate::resources::{AlbumArt, PlaylistCard, UserProfile};
use crate::sessions::SessionRegistry;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    redirector: Arc<AuthRedirector>,
    exchanger: Arc<TokenExchanger>,
    fetcher: PaginatedFetcher,
    api_base: Arc<str>,
    sessions: SessionRegistry,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

impl AppState {
    fn new(
        oauth: OAuthClientConfig,
        client: reqwest::Client,
        store: Arc<dyn KeyValueStore>,
        api: &ApiConfig,
        prometheus: PrometheusHandle,
    ) -> Self {
        let transport = Arc::new(HttpTransport::new(client.clone()));
        Self {
            redirector: Arc::new(AuthRedirector::new(oauth.clone(), store.clone())),
            exchanger: Arc::new(TokenExchanger::new(client, oauth, store)),
            fetcher: PaginatedFetcher::new(transport).with_max_pages(api.max_pages),
            api_base: api.base_url.as_str().into(),
            sessions: SessionRegistry::new(),
            started_at: Instant::now(),
            prometheus,
        }
    }
}

/// Build the axum router with all routes and shared state.
///
/// `/` and `/callback` share one handler: both are "the page", and what
/// happens depends only on the query string the provider attached.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(landing_handler))
        .route("/callback", get(landing_handler))
        .route("/sessions/{id}/album-art", get(album_art_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting playlist-gallery");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        client_id = %config.oauth.client_id,
        redirect_uri = %config.oauth.redirect_uri,
        api_base = %config.api.base_url,
        max_pages = config.api.max_pages,
        "configuration loaded"
    );

    if let Ok(redirect) = reqwest::Url::parse(&config.oauth.redirect_uri)
        && redirect.port_or_known_default() != Some(config.server.listen_addr.port())
    {
        warn!(
            redirect_uri = %config.oauth.redirect_uri,
            listen_addr = %config.server.listen_addr,
            "redirect_uri port differs from listen port, the provider callback will not reach this process"
        );
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let store: Arc<dyn KeyValueStore> = match &config.storage.verifier_file {
        Some(path) => {
            let file_store = FileStore::open(path.clone())
                .await
                .with_context(|| format!("failed to open verifier store {}", path.display()))?;
            info!(path = %file_store.path().display(), "using file verifier store");
            Arc::new(file_store)
        }
        None => {
            info!("using in-memory verifier store");
            Arc::new(MemoryStore::new())
        }
    };

    let listen_addr = config.server.listen_addr;
    let state = AppState::new(
        config.oauth,
        client,
        store,
        &config.api,
        prometheus_handle,
    );
    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests, open http://{listen_addr}/ to sign in");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// One resource's result on the rendered page.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ResourceOutcome<T> {
    Ok { data: T },
    Error { error: String },
}

impl<T> From<paging::Result<T>> for ResourceOutcome<T> {
    fn from(result: paging::Result<T>) -> Self {
        match result {
            Ok(data) => ResourceOutcome::Ok { data },
            Err(e) => ResourceOutcome::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Body of a successful sign-in page load.
#[derive(Debug, Serialize)]
struct Dashboard {
    session_id: String,
    profile: ResourceOutcome<UserProfile>,
    playlists: ResourceOutcome<Vec<PlaylistCard>>,
}

/// GET / and GET /callback: one page load of the application.
async fn landing_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let outcome = params.classify();
    let (auth_state, action) = handle_event(
        AuthState::NoCode,
        AuthEvent::PageLoaded(outcome.clone()),
    );

    match action {
        AuthAction::StartAuthorization => start_authorization(&state, auth_state).await,
        AuthAction::ExchangeCode { code } => complete_sign_in(&state, auth_state, &code).await,
        AuthAction::ReportFailure { reason } => {
            warn!(reason, "provider returned an error instead of a code");
            match outcome {
                CallbackOutcome::Denied { error, description } => {
                    AppError::from(pkce_auth::Error::AuthorizationDenied { error, description })
                        .into_response()
                }
                _ => AppError::BadRequest(reason).into_response(),
            }
        }
        other => {
            error!(?other, "unexpected action for page load");
            AppError::BadRequest("unexpected page load".into()).into_response()
        }
    }
}

/// Persist a fresh verifier and send the browser to the provider.
async fn start_authorization(state: &AppState, auth_state: AuthState) -> Response {
    match state.redirector.begin().await {
        Ok(url) => {
            let (auth_state, _) = handle_event(auth_state, AuthEvent::RedirectIssued);
            debug!(?auth_state, "redirecting to authorization endpoint");
            (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to start authorization");
            AppError::from(e).into_response()
        }
    }
}

/// Redeem the code, open a session and render both collections.
async fn complete_sign_in(state: &AppState, auth_state: AuthState, code: &str) -> Response {
    let token = match state.exchanger.exchange(code).await {
        Ok(token) => {
            metrics::record_token_exchange("success");
            token
        }
        Err(e) => {
            let outcome = match e {
                pkce_auth::Error::MissingVerifier => "missing_verifier",
                _ => "failure",
            };
            metrics::record_token_exchange(outcome);
            let (auth_state, _) = handle_event(auth_state, AuthEvent::ExchangeFailed(e.to_string()));
            warn!(error = %e, ?auth_state, "sign-in failed");
            return AppError::from(e).into_response();
        }
    };

    let session = Session::new(token);
    let session_id = session.id();
    let active = state.sessions.insert(session.clone()).await;
    metrics::set_active_sessions(active);

    let (_, action) = handle_event(auth_state, AuthEvent::ExchangeSucceeded { session_id });
    info!(%session_id, ?action, "signed in");

    // Independent collections: fetched concurrently, each may fail alone
    let (profile, playlists) = tokio::join!(
        timed(
            "profile",
            resources::fetch_profile(&state.fetcher, &state.api_base, &session)
        ),
        timed(
            "playlists",
            resources::fetch_playlists(&state.fetcher, &state.api_base, &session)
        ),
    );

    Json(Dashboard {
        session_id: session_id.to_string(),
        profile: profile.into(),
        playlists: playlists
            .map(|playlists| resources::playlist_cards(&playlists))
            .into(),
    })
    .into_response()
}

/// Run one resource fetch, recording its duration and outcome.
async fn timed<T>(
    resource: &'static str,
    fetch: impl Future<Output = paging::Result<T>>,
) -> paging::Result<T> {
    let started = Instant::now();
    let result = fetch.await;
    let elapsed = started.elapsed().as_secs_f64();
    match &result {
        Ok(_) => {
            debug!(resource, elapsed, "resource fetched");
            metrics::record_resource_fetch(resource, "ok", elapsed);
        }
        Err(e) => {
            warn!(resource, error = %e, "resource fetch failed");
            metrics::record_resource_fetch(resource, "error", elapsed);
        }
    }
    result
}

#[derive(Debug, Deserialize)]
struct AlbumArtQuery {
    tracks_href: String,
}

/// GET /sessions/{id}/album-art?tracks_href=...: covers of a playlist's tracks.
///
/// `tracks_href` must live under the configured API base so the bearer token
/// is never sent to an arbitrary host.
async fn album_art_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(query): Query<AlbumArtQuery>,
) -> Result<Json<AlbumArt>, AppError> {
    let id = Uuid::parse_str(&raw_id).map_err(|_| AppError::SessionNotFound(raw_id.clone()))?;
    let Some(session) = state.sessions.get(id).await else {
        // Lookup may have evicted an expired session
        metrics::set_active_sessions(state.sessions.len().await);
        return Err(AppError::SessionNotFound(raw_id));
    };
    debug!(
        session_id = %id,
        age_secs = session.age().as_secs(),
        expires_in_secs = session.access_token().expires_in().as_secs(),
        "album art requested"
    );

    if !query.tracks_href.starts_with(&format!("{}/", state.api_base)) {
        return Err(AppError::BadRequest(format!(
            "tracks_href must be under {}",
            state.api_base
        )));
    }

    let art = timed(
        "album_art",
        resources::fetch_album_art(&state.fetcher, &session, &query.tracks_href),
    )
    .await?;
    Ok(Json(art))
}

/// Health endpoint: JSON with uptime and live session count.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "active_sessions": state.sessions.len().await,
    }))
}

/// Prometheus metrics endpoint: renders all registered metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Form;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request};
    use axum::routing::post;
    use common::Secret;
    use pkce_auth::VERIFIER_KEY;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use tower::ServiceExt;

    const GOOD_CODE: &str = "AQB-good-code";
    const TOKEN: &str = "BQD-test-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some(&format!("Bearer {TOKEN}"))
    }

    async fn mock_token(Form(form): Form<HashMap<String, String>>) -> Response {
        let valid = form.get("code").map(String::as_str) == Some(GOOD_CODE)
            && form.get("grant_type").map(String::as_str) == Some("authorization_code")
            && form.get("code_verifier").is_some_and(|v| v.len() >= 43);
        if valid {
            Json(json!({"access_token": TOKEN, "token_type": "Bearer", "expires_in": 3600}))
                .into_response()
        } else {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid_grant", "error_description": "Invalid authorization code"})),
            )
                .into_response()
        }
    }

    async fn mock_profile(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Json(json!({
            "id": "wizzler",
            "display_name": "Wizzler",
            "email": "wizzler@example.com",
            "uri": "spotify:user:wizzler",
            "href": "https://api.spotify.com/v1/users/wizzler",
            "images": [{"url": "https://i.scdn.co/avatar.jpg", "height": 300, "width": 300}],
            "external_urls": {"spotify": "https://open.spotify.com/user/wizzler"}
        }))
        .into_response()
    }

    /// Two pages: a quoted name and an empty name first, then one more.
    async fn mock_playlists(
        State(base): State<String>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        let page = match query.get("offset") {
            None => json!({
                "items": [
                    {
                        "id": "p1",
                        "name": "\"Road Trip\"",
                        "images": [{"url": "https://i.scdn.co/cover1.jpg"}],
                        "tracks": {"href": format!("{base}/v1/playlists/p1/tracks"), "total": 4}
                    },
                    {"id": "p2", "name": "", "images": null}
                ],
                "next": format!("{base}/v1/me/playlists?offset=2")
            }),
            Some(_) => json!({
                "items": [{"id": "p3", "name": "Focus", "images": []}],
                "next": null
            }),
        };
        Json(page).into_response()
    }

    async fn mock_looping_playlists(State(base): State<String>) -> Json<Value> {
        Json(json!({
            "items": [{"id": "p1", "name": "Again"}],
            "next": format!("{base}/looping/v1/me/playlists")
        }))
    }

    async fn mock_tracks(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Json(json!({
            "items": [
                {"track": {"type": "track", "album": {"images": [{"url": "art-1"}]}}},
                {"track": {"type": "episode"}},
                {"track": null},
                {"track": {"type": "track", "album": {"images": [{"url": "art-2"}, {"url": "art-2-small"}]}}}
            ],
            "next": null
        }))
        .into_response()
    }

    /// Start a mock accounts service + Web API. Returns its base URL.
    ///
    /// - `/v1/...` behaves normally
    /// - `/broken/v1/me` fails with 500, playlists still work
    /// - `/looping/v1/me/playlists` points `next` back at itself
    async fn start_mock_spotify() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let app = axum::Router::new()
            .route("/api/token", post(mock_token))
            .route("/v1/me", get(mock_profile))
            .route("/v1/me/playlists", get(mock_playlists))
            .route("/v1/playlists/p1/tracks", get(mock_tracks))
            .route(
                "/broken/v1/me",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/broken/v1/me/playlists", get(mock_playlists))
            .route("/looping/v1/me", get(mock_profile))
            .route("/looping/v1/me/playlists", get(mock_looping_playlists))
            .with_state(base.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        base
    }

    /// App wired to the mock server, with `api_prefix` selecting its behaviour.
    fn test_app(base: &str, api_prefix: &str) -> (Router, AppState, Arc<MemoryStore>) {
        let mut oauth = OAuthClientConfig::new("client-abc");
        oauth.token_endpoint = format!("{base}/api/token");
        let api = ApiConfig {
            base_url: format!("{base}{api_prefix}/v1"),
            timeout_secs: 5,
            max_pages: 50,
        };
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            oauth,
            reqwest::Client::new(),
            store.clone(),
            &api,
            metrics::isolated_handle(),
        );
        (build_router(state.clone(), 16), state, store)
    }

    async fn send(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn store_verifier(store: &MemoryStore) {
        store
            .set(VERIFIER_KEY, Secret::new("v".repeat(64)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn first_visit_redirects_to_provider() {
        let base = start_mock_spotify().await;
        let (app, _state, store) = test_app(&base, "");

        let response = send(&app, "/").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        let url = reqwest::Url::parse(location).unwrap();
        assert_eq!(
            format!("{}://{}{}", url.scheme(), url.host_str().unwrap(), url.path()),
            "https://accounts.spotify.com/authorize"
        );

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let verifier = store.get(VERIFIER_KEY).await.unwrap().expect("verifier persisted");
        assert_eq!(
            params["code_challenge"],
            pkce_auth::compute_challenge(verifier.expose())
        );
        assert_eq!(params["client_id"], "client-abc");
        assert_eq!(params["response_type"], "code");
    }

    #[tokio::test]
    async fn callback_without_code_also_redirects() {
        let base = start_mock_spotify().await;
        let (app, _state, _store) = test_app(&base, "");

        let response = send(&app, "/callback").await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn denial_is_reported_not_restarted() {
        let base = start_mock_spotify().await;
        let (app, _state, store) = test_app(&base, "");

        let response = send(&app, "/callback?error=access_denied").await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::LOCATION).is_none());
        assert_eq!(body_json(response).await["error"], "authorization_denied");
        assert!(store.get(VERIFIER_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn code_without_verifier_asks_for_restart() {
        let base = start_mock_spotify().await;
        let (app, state, _store) = test_app(&base, "");

        let response = send(&app, &format!("/callback?code={GOOD_CODE}")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "restart_sign_in");
        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn sign_in_renders_profile_and_all_playlist_pages() {
        let base = start_mock_spotify().await;
        let (app, state, store) = test_app(&base, "");
        store_verifier(&store).await;

        let response = send(&app, &format!("/callback?code={GOOD_CODE}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;

        assert_eq!(json["profile"]["status"], "ok");
        assert_eq!(json["profile"]["data"]["id"], "wizzler");
        assert_eq!(json["profile"]["data"]["display_name"], "Wizzler");

        assert_eq!(json["playlists"]["status"], "ok");
        let names: Vec<&str> = json["playlists"]["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|card| card["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Road Trip", "Focus"]);
        assert_eq!(
            json["playlists"]["data"][0]["cover_url"],
            "https://i.scdn.co/cover1.jpg"
        );

        let session_id = Uuid::parse_str(json["session_id"].as_str().unwrap()).unwrap();
        assert!(state.sessions.get(session_id).await.is_some());
        assert!(
            store.get(VERIFIER_KEY).await.unwrap().is_none(),
            "verifier must be consumed by the exchange"
        );
    }

    #[tokio::test]
    async fn rejected_code_is_bad_gateway() {
        let base = start_mock_spotify().await;
        let (app, state, store) = test_app(&base, "");
        store_verifier(&store).await;

        let response = send(&app, "/callback?code=expired-code").await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "token_exchange_failed");
        assert!(json["message"].as_str().unwrap().contains("invalid_grant"));
        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn profile_failure_does_not_hide_playlists() {
        let base = start_mock_spotify().await;
        let (app, _state, store) = test_app(&base, "/broken");
        store_verifier(&store).await;

        let response = send(&app, &format!("/callback?code={GOOD_CODE}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["profile"]["status"], "error");
        assert!(
            json["profile"]["error"].as_str().unwrap().contains("500"),
            "got: {}",
            json["profile"]
        );
        assert_eq!(json["playlists"]["status"], "ok");
        assert_eq!(json["playlists"]["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn pagination_cycle_fails_only_that_resource() {
        let base = start_mock_spotify().await;
        let (app, _state, store) = test_app(&base, "/looping");
        store_verifier(&store).await;

        let response = send(&app, &format!("/callback?code={GOOD_CODE}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["profile"]["status"], "ok");
        assert_eq!(json["playlists"]["status"], "error");
        assert!(
            json["playlists"]["error"]
                .as_str()
                .unwrap()
                .contains("pagination protocol violated"),
            "got: {}",
            json["playlists"]
        );
    }

    #[tokio::test]
    async fn album_art_uses_session_token() {
        let base = start_mock_spotify().await;
        let (app, _state, store) = test_app(&base, "");
        store_verifier(&store).await;

        let json = body_json(send(&app, &format!("/callback?code={GOOD_CODE}")).await).await;
        let session_id = json["session_id"].as_str().unwrap();
        let tracks_href = json["playlists"]["data"][0]["tracks_href"].as_str().unwrap();

        let response = send(
            &app,
            &format!("/sessions/{session_id}/album-art?tracks_href={tracks_href}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let art = body_json(response).await;
        let urls: Vec<&str> = art["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|image| image["url"].as_str().unwrap())
            .collect();
        assert_eq!(urls, vec!["art-1", "art-2"]);
        assert_eq!(art["grid_dimension"], 1);
    }

    #[tokio::test]
    async fn album_art_rejects_foreign_host() {
        let base = start_mock_spotify().await;
        let (app, state, _store) = test_app(&base, "");
        let session = Session::new(pkce_auth::AccessToken::new(
            Secret::new(TOKEN.into()),
            Duration::from_secs(3600),
        ));
        let session_id = session.id();
        state.sessions.insert(session).await;

        let response = send(
            &app,
            &format!("/sessions/{session_id}/album-art?tracks_href=https://evil.example.com/v1/x"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn album_art_expired_session_is_not_found() {
        let base = start_mock_spotify().await;
        let (app, state, _store) = test_app(&base, "");
        let session = Session::new(pkce_auth::AccessToken::new(
            Secret::new(TOKEN.into()),
            Duration::ZERO,
        ));
        let session_id = session.id();
        state.sessions.insert(session).await;

        let response = send(
            &app,
            &format!("/sessions/{session_id}/album-art?tracks_href={base}/v1/playlists/p1/tracks"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "session_not_found");
        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn album_art_unknown_session_is_not_found() {
        let base = start_mock_spotify().await;
        let (app, _state, _store) = test_app(&base, "");

        for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            let response = send(
                &app,
                &format!("/sessions/{id}/album-art?tracks_href={base}/v1/playlists/p1/tracks"),
            )
            .await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn health_reports_active_sessions() {
        let base = start_mock_spotify().await;
        let (app, _state, store) = test_app(&base, "");
        store_verifier(&store).await;
        send(&app, &format!("/callback?code={GOOD_CODE}")).await;

        let response = send(&app, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["active_sessions"], 1);
    }

    #[tokio::test]
    async fn metrics_endpoint_is_prometheus_text() {
        let base = start_mock_spotify().await;
        let (app, _state, _store) = test_app(&base, "");

        let response = send(&app, "/metrics").await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"), "got: {content_type}");
    }
}
