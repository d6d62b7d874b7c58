//! Axum HTTP surface over [`engine::GameEngine`].
//!
//! Every handler below does nothing but translate a request into one
//! `GameEngine` call and the result back into JSON (or raw bytes, for the
//! asset-serving routes) — all orchestration logic lives in `engine` and
//! its constituent crates. Session-asset filenames are validated before
//! any filesystem touch, matching the same id-validation discipline
//! `engine_core::SessionId::parse` applies to session identifiers.

#![deny(missing_docs)]

mod assets;
mod dto;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path as AxumPath, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use engine::engine_core::{SessionId, SortKey};
use engine::GameEngine;

pub use error::ApiError;

use dto::{
    ActionImageRequest, ActionImageResponse, ChoicesRequest, ChoicesResponse, CreateSessionRequest,
    ListSessionsQuery, SessionResponse, StatusResponse,
};

/// Shared state every handler closes over: the engine facade and the
/// filesystem root session assets (images/tapes/videos) are served from.
///
/// The asset root is independent of `SessionStore` deliberately —
/// `SessionStore` is an abstract CRUD boundary, not a byte-serving one,
/// so this crate reads session asset files directly off disk the same
/// way `engine-state-fs` lays them out.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<GameEngine>,
    assets_root: PathBuf,
}

impl AppState {
    /// Wire the HTTP surface over an already-constructed engine and the
    /// filesystem root its session asset directories live under.
    pub fn new(engine: Arc<GameEngine>, assets_root: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            assets_root: assets_root.into(),
        }
    }
}

/// Build the full router described in the HTTP surface: session CRUD,
/// the three game-trigger endpoints, and the three asset-serving routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route(
            "/api/sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/{id}/status", get(get_status))
        .route("/api/sessions/{id}/images/{file}", get(serve_image))
        .route("/api/sessions/{id}/tapes/{file}", get(serve_tape))
        .route("/api/sessions/{id}/videos/{file}", get(serve_video))
        .route("/api/game/intro", post(intro))
        .route("/api/game/action/image", post(action_image))
        .route("/api/game/action/choices", post(action_choices))
        .with_state(state)
}

async fn serve_image(
    state: State<AppState>,
    path: AxumPath<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    assets::serve_asset(state, path, assets::AssetKind::Image).await
}

async fn serve_tape(
    state: State<AppState>,
    path: AxumPath<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    assets::serve_asset(state, path, assets::AssetKind::Tape).await
}

async fn serve_video(
    state: State<AppState>,
    path: AxumPath<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    assets::serve_asset(state, path, assets::AssetKind::Video).await
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = req.session_id.map(SessionId::parse).transpose()?;
    let meta = state
        .engine
        .create_session(&req.name, req.description.as_deref(), id)
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(SessionResponse::from(meta))))
}

async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sort = match query.sort.as_deref() {
        Some("created_at") => SortKey::CreatedAt,
        Some("name") => SortKey::Name,
        Some("last_accessed") | None => SortKey::LastAccessed,
        Some(other) => return Err(ApiError::BadRequest(format!("unknown sort key {other:?}"))),
    };
    let limit = query.limit.unwrap_or(50);
    let sessions = state.engine.list_sessions(sort, limit).await?;
    Ok(Json(
        sessions.into_iter().map(SessionResponse::from).collect::<Vec<_>>(),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = SessionId::parse(id)?;
    let meta = state.engine.get_session(&session).await?;
    Ok(Json(SessionResponse::from(meta)))
}

async fn get_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = SessionId::parse(id)?;
    let meta = state.engine.get_session(&session).await?;
    Ok(Json(StatusResponse {
        session_id: meta.session_id.to_string(),
        turn_count: meta.turn_count,
        player_alive: meta.player_alive,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = SessionId::parse(id)?;
    state.engine.delete_session(&session).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn intro(
    State(state): State<AppState>,
    Json(req): Json<ChoicesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = SessionId::parse(req.session_id)?;
    let result = state.engine.start_intro(&session).await?;
    Ok(Json(begin_countdown_response(&state, &session, result)))
}

async fn action_image(
    State(state): State<AppState>,
    Json(req): Json<ActionImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = SessionId::parse(req.session_id)?;
    let submission = state
        .engine
        .submit_choice(&session, req.choice_text, req.is_custom)
        .await?;
    Ok(Json(ActionImageResponse::from(submission)))
}

async fn action_choices(
    State(state): State<AppState>,
    Json(req): Json<ChoicesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = SessionId::parse(req.session_id)?;
    let result = state.engine.cached_choices(&session).ok_or_else(|| {
        ApiError::Conflict(format!(
            "no choices have been produced yet for session {session}"
        ))
    })?;
    Ok(Json(begin_countdown_response(&state, &session, result)))
}

fn begin_countdown_response(
    state: &AppState,
    session: &SessionId,
    result: engine::engine_turn::PhaseBResult,
) -> ChoicesResponse {
    state.engine.begin_countdown(session);
    spawn_countdown_watcher(Arc::clone(&state.engine), session.clone());
    ChoicesResponse {
        choices: result.choices,
        timeout_penalty: result.penalty,
        countdown_deadline_ms: state.engine.config().countdown_deadline.as_millis(),
    }
}

/// Race a just-started countdown in the background; if the deadline wins,
/// run the forced `TimeoutPenalty` turn automatically. If a player answer
/// (or a subsequent restart) cancels the countdown first, this is a no-op.
fn spawn_countdown_watcher(engine: Arc<GameEngine>, session: SessionId) {
    tokio::spawn(async move {
        match engine.race_countdown(&session).await {
            Some(engine::engine_countdown::CountdownOutcome::Deadline) => {
                if let Err(err) = engine.submit_timeout(&session).await {
                    tracing::warn!(session = %session, error = %err, "engine.http.countdown.timeout_turn_failed");
                }
            }
            Some(_) | None => {}
        }
    });
}
