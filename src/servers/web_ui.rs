use axum::{
    extract::{Json, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::Settings;
use crate::game::{Direction, Snapshot};
use crate::leaderboard::{
    player_display_name, LeaderboardDatabase, LeaderboardError, ScoreSubmission,
};
use crate::services::{new_session_id, SessionManager};
use crate::utils::device::{detect_device, DeviceInfo};
use crate::{Result, TileMergeError};

pub const SESSION_COOKIE: &str = "session_id";
pub const PLAYER_COOKIE: &str = "player_id";

// Structures pour l'API Web
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MoveRequest {
    pub direction: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MoveResponse {
    pub moved: bool,
    pub state: Snapshot,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NewGameRequest {
    #[serde(default)]
    pub size: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitScoreResponse {
    pub success: bool,
    pub player_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RankResponse {
    pub score: u64,
    pub rank: usize,
}

#[derive(Deserialize, Debug, Default)]
pub struct ScoresQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
pub struct IndexQuery {
    pub software: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RankQuery {
    pub score: u64,
}

#[derive(Serialize, Debug, Clone)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub active_sessions: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Everything the HTTP handlers share
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: SessionManager,
    pub leaderboard: LeaderboardDatabase,
}

// Configuration pour le serveur Web UI
#[derive(Debug, Clone)]
pub struct WebUiConfig {
    pub port: u16,
    pub host: String,
}

impl Default for WebUiConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
        }
    }
}

// Serveur Web UI principal
pub struct WebUiServer {
    config: WebUiConfig,
    state: AppState,
}

impl WebUiServer {
    pub fn new(config: WebUiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn start(&self) -> Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| TileMergeError::Server(format!("invalid web address: {e}")))?;
        let listener = TcpListener::bind(addr).await?;

        log::info!(
            "🌐 Web server starting on http://localhost:{}",
            self.config.port
        );

        axum::serve(listener, app).await?;
        Ok(())
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(serve_index))
            .route("/desktop", get(serve_desktop))
            .route("/local", get(serve_desktop))
            .route("/software", get(serve_software))
            .route("/api/status", get(api_status))
            .route("/api/game/state", get(api_game_state))
            .route("/api/game/move", post(api_game_move))
            .route("/api/game/new", post(api_new_game))
            .route("/api/game/scores", get(api_scores).post(api_submit_score))
            .route("/api/leaderboard", get(api_scores))
            .route("/api/game/leaderboard/stats", get(api_leaderboard_stats))
            .route("/api/game/leaderboard/rank", get(api_leaderboard_rank))
            .with_state(self.state.clone())
            .nest_service("/static", ServeDir::new("web"))
            .fallback_service(ServeDir::new("web"))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
    }
}

// ============================================================================
// COOKIES & DEVICE
// ============================================================================

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Existing cookie value, or a fresh id flagged as new.
fn cookie_or_new(headers: &HeaderMap, name: &str) -> (String, bool) {
    match cookie_value(headers, name) {
        Some(value) => (value, false),
        None => (new_session_id(), true),
    }
}

fn set_cookie(response: &mut Response, name: &str, value: &str) {
    let cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => log::warn!("Unable to set cookie {}: {}", name, e),
    }
}

fn device_from_headers(headers: &HeaderMap) -> DeviceInfo {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    detect_device(user_agent)
}

// ============================================================================
// PAGES
// ============================================================================

async fn load_page(path: &str) -> String {
    tokio::fs::read_to_string(path).await.unwrap_or_else(|_| {
        r#"<!DOCTYPE html>
<html><head><title>Tile Merge</title></head>
<body>
<h1>🎮 Tile Merge</h1>
<p>Use the arrow keys to merge tiles and reach 2048.</p>
<p>Page files should be in ./web/ directory</p>
</body></html>"#
            .to_string()
    })
}

/// Page for `/`: the packaged client asks for its own page with
/// `?software=true`, other clients get one by device class.
fn index_page(device: &DeviceInfo, software: bool) -> &'static str {
    if software {
        "web/software.html"
    } else if device.is_mobile_class() {
        "web/mobile.html"
    } else {
        "web/desktop.html"
    }
}

async fn serve_index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
    headers: HeaderMap,
) -> Response {
    let device = device_from_headers(&headers);
    let page = index_page(&device, query.software.as_deref() == Some("true"));

    let (session_id, is_new) = cookie_or_new(&headers, SESSION_COOKIE);
    let size = state
        .settings
        .game
        .resolve_size(state.settings.game.default_size as i64, device.is_mobile_class())
        .unwrap_or(state.settings.game.min_size);
    if let Err(e) = state.sessions.ensure_session(&session_id, size).await {
        log::warn!("⚠️ Could not open a game for session {}: {}", session_id, e);
    }

    let mut response = Html(load_page(page).await).into_response();
    if is_new {
        set_cookie(&mut response, SESSION_COOKIE, &session_id);
    }
    response
}

async fn serve_desktop() -> Html<String> {
    Html(load_page("web/desktop.html").await)
}

async fn serve_software() -> Html<String> {
    Html(load_page("web/software_embedded.html").await)
}

// ============================================================================
// GAME API
// ============================================================================

async fn api_status(State(state): State<AppState>) -> Json<ApiResponse> {
    Json(ApiResponse {
        status: "ready".to_string(),
        message: "Tile Merge server is running".to_string(),
        active_sessions: state.sessions.len().await,
    })
}

async fn api_game_state(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = cookie_value(&headers, SESSION_COOKIE) else {
        return error_response(StatusCode::NOT_FOUND, "Game not found");
    };

    match state.sessions.snapshot(&session_id).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Game not found"),
    }
}

async fn api_game_move(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MoveRequest>,
) -> Response {
    let Some(session_id) = cookie_value(&headers, SESSION_COOKIE) else {
        return error_response(StatusCode::NOT_FOUND, "Game not found");
    };

    let direction: Direction = match request.direction.parse() {
        Ok(direction) => direction,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match state.sessions.apply_move(&session_id, direction).await {
        Some((moved, snapshot)) => Json(MoveResponse {
            moved,
            state: snapshot,
        })
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Game not found"),
    }
}

async fn api_new_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewGameRequest>,
) -> Response {
    let game = &state.settings.game;
    let device = device_from_headers(&headers);
    let requested = request.size.unwrap_or(game.default_size as i64);

    let size = match game.resolve_size(requested, device.is_mobile_class()) {
        Ok(size) => size,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let (session_id, is_new) = cookie_or_new(&headers, SESSION_COOKIE);
    match state.sessions.create_session(&session_id, size).await {
        Ok(snapshot) => {
            let mut response = Json(snapshot).into_response();
            if is_new {
                set_cookie(&mut response, SESSION_COOKIE, &session_id);
            }
            response
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

// ============================================================================
// LEADERBOARD API
// ============================================================================

async fn api_scores(State(state): State<AppState>, Query(query): Query<ScoresQuery>) -> Response {
    let limit = query.limit.unwrap_or(state.settings.leaderboard.top_limit);
    match state.leaderboard.top_scores(limit) {
        Ok(scores) => Json(scores).into_response(),
        Err(e) => {
            log::error!("❌ Failed to read leaderboard: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Leaderboard unavailable")
        }
    }
}

async fn api_submit_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(submission): Json<ScoreSubmission>,
) -> Response {
    let (player_id, is_new) = cookie_or_new(&headers, PLAYER_COOKIE);
    let player_name = player_display_name(&player_id);

    match state.leaderboard.add_or_update_score(&player_name, &submission) {
        Ok(_) => {}
        Err(e @ LeaderboardError::OutOfRange(_)) => {
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
        Err(e) => {
            log::error!("❌ Failed to record score for {}: {}", player_name, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to record score");
        }
    }

    let mut response = Json(SubmitScoreResponse {
        success: true,
        player_id: player_id.clone(),
    })
    .into_response();
    if is_new {
        set_cookie(&mut response, PLAYER_COOKIE, &player_id);
    }
    response
}

async fn api_leaderboard_stats(State(state): State<AppState>) -> Response {
    match state.leaderboard.stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            log::error!("❌ Failed to compute leaderboard stats: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Leaderboard unavailable")
        }
    }
}

async fn api_leaderboard_rank(
    State(state): State<AppState>,
    Query(query): Query<RankQuery>,
) -> Response {
    match state.leaderboard.rank_for_score(query.score) {
        Ok(rank) => Json(RankResponse {
            score: query.score,
            rank,
        })
        .into_response(),
        Err(e) => {
            log::error!("❌ Failed to rank score: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Leaderboard unavailable")
        }
    }
}
