//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Extension, Path, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::error;

use crate::app::AppState;
use crate::game::{SessionError, SessionSnapshot};
use crate::http::middleware::{require_auth, AuthenticatedUser};
use crate::matchmaking::SessionId;
use crate::progression::{Profile, ProgressionError, UnitKind, UpgradeReceipt};
use crate::store::StoreError;
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/lobby", get(lobby_handler))
        .route("/lobby/join", post(lobby_join_handler))
        .route("/lobby/leave", post(lobby_leave_handler))
        .route("/lobby/status", get(lobby_status_handler))
        .route("/game/:session_id/state", get(game_state_handler))
        .route("/game/:session_id/deploy", post(deploy_handler))
        .route("/profile", get(profile_handler))
        .route("/upgrade/troop", post(upgrade_troop_handler))
        .route("/upgrade/tower", post(upgrade_tower_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    queue_size: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
        queue_size: state.lobby.queue_len(),
    })
}

// ============================================================================
// Lobby endpoints
// ============================================================================

#[derive(Serialize)]
struct LobbyResponse {
    queue_length: usize,
}

async fn lobby_handler(State(state): State<AppState>) -> Json<LobbyResponse> {
    Json(LobbyResponse {
        queue_length: state.lobby.queue_len(),
    })
}

#[derive(Serialize)]
struct JoinLobbyResponse {
    status: &'static str,
    session_id: Option<SessionId>,
}

async fn lobby_join_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Json<JoinLobbyResponse> {
    let session_id = state.lobby.join(&auth.username);

    Json(JoinLobbyResponse {
        status: if session_id.is_some() { "matched" } else { "queued" },
        session_id,
    })
}

#[derive(Serialize)]
struct LeaveLobbyResponse {
    left: bool,
}

async fn lobby_leave_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Json<LeaveLobbyResponse> {
    Json(LeaveLobbyResponse {
        left: state.lobby.leave(&auth.username),
    })
}

#[derive(Serialize)]
struct LobbyStatusResponse {
    session_id: Option<SessionId>,
}

async fn lobby_status_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Json<LobbyStatusResponse> {
    Json(LobbyStatusResponse {
        session_id: state.lobby.session_for(&auth.username),
    })
}

// ============================================================================
// Game endpoints
// ============================================================================

async fn game_state_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get_or_create(&session_id)?;
    Ok(Json(session.poll(&auth.username)?))
}

#[derive(Deserialize)]
struct DeployRequest {
    troop: String,
}

#[derive(Serialize)]
struct DeployResponse {
    success: bool,
}

async fn deploy_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<DeployRequest>,
) -> Result<Json<DeployResponse>, AppError> {
    let session = state.sessions.get_or_create(&session_id)?;
    session.deploy(&auth.username, &req.troop)?;

    Ok(Json(DeployResponse { success: true }))
}

// ============================================================================
// Progression endpoints
// ============================================================================

async fn profile_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.progression.profile(&auth.username)?))
}

#[derive(Deserialize)]
struct UpgradeRequest {
    name: String,
}

#[derive(Serialize)]
struct UpgradeResponse {
    success: bool,
    #[serde(flatten)]
    receipt: UpgradeReceipt,
}

async fn upgrade_troop_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<UpgradeRequest>,
) -> Result<Json<UpgradeResponse>, AppError> {
    upgrade(&state, &auth, UnitKind::Troop, &req.name)
}

async fn upgrade_tower_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<UpgradeRequest>,
) -> Result<Json<UpgradeResponse>, AppError> {
    upgrade(&state, &auth, UnitKind::Tower, &req.name)
}

fn upgrade(
    state: &AppState,
    auth: &AuthenticatedUser,
    kind: UnitKind,
    name: &str,
) -> Result<Json<UpgradeResponse>, AppError> {
    let receipt = state.progression.upgrade(&auth.username, kind, name)?;

    Ok(Json(UpgradeResponse {
        success: true,
        receipt,
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadyFinished
            | SessionError::TimeExpired
            | SessionError::TroopNotInHand(_)
            | SessionError::InsufficientMana { .. } => AppError::BadRequest(err.to_string()),
            SessionError::NotInSession(_) => AppError::Forbidden(err.to_string()),
            SessionError::PairingNotReady(_) => AppError::NotFound(err.to_string()),
            SessionError::Store(store) => store.into(),
            SessionError::Catalog(catalog) => AppError::Internal(catalog.to_string()),
        }
    }
}

impl From<ProgressionError> for AppError {
    fn from(err: ProgressionError) -> Self {
        match err {
            ProgressionError::UnknownUnit(_) | ProgressionError::NotEnoughExp { .. } => {
                AppError::BadRequest(err.to_string())
            }
            ProgressionError::Store(store) => store.into(),
            ProgressionError::Catalog(catalog) => AppError::Internal(catalog.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
