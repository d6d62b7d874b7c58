//! Maps every error this crate's handlers can produce onto the §6 HTTP
//! status codes: `400` for invalid input, `404` for not found, `409` for
//! a session-id collision or a Phase-B request with no prior choices.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use engine::engine_core::{SessionError, TurnError};
use engine::engine_death::DeathError;
use engine::engine_scheduler::DispatchError;
use engine::GameEngineError;

/// The uniform error envelope every handler returns on failure: a short
/// machine code plus a human-readable message, per §7's user-visible
/// behavior for `TurnFailed`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Every way a handler in this crate can fail, carrying enough to pick
/// the right status code without re-matching on the wrapped error type
/// at each call site.
#[non_exhaustive]
#[derive(Debug)]
pub enum ApiError {
    /// Malformed session id, filename, or request body. `400`.
    BadRequest(String),
    /// Session or asset not found. `404`.
    NotFound(String),
    /// Explicit session id collision. `409`.
    Conflict(String),
    /// Turn accepted in a state that does not allow it (dead player,
    /// Phase B without Phase A, a turn already in flight). `409`.
    InvalidState(String),
    /// Anything else: a persistent disk failure, a death sequence that
    /// could not complete. `500`.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "invalid_input", message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "already_exists", message),
            ApiError::InvalidState(message) => (StatusCode::CONFLICT, "invalid_state", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "turn_failed", message)
            }
        };
        (status, Json(ErrorBody { code, message })).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidInput(message) => ApiError::BadRequest(message),
            SessionError::NotFound(message) => ApiError::NotFound(message),
            SessionError::AlreadyExists(message) => ApiError::Conflict(message),
            SessionError::Io(message) | SessionError::Serialization(message) => {
                ApiError::Internal(message)
            }
            SessionError::Other(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::InvalidState(message) => ApiError::InvalidState(message),
            TurnError::Cancelled => ApiError::InvalidState("turn cancelled".to_string()),
            TurnError::TurnFailed(message) => ApiError::Internal(message),
            TurnError::Session(err) => err.into(),
            TurnError::Other(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Scheduler(scheduler_err) => {
                ApiError::InvalidState(scheduler_err.to_string())
            }
            DispatchError::Turn(turn_err) => turn_err.into(),
        }
    }
}

impl From<DeathError> for ApiError {
    fn from(err: DeathError) -> Self {
        match err {
            DeathError::NotEnoughFrames { .. } => ApiError::InvalidState(err.to_string()),
            DeathError::Replay(_) => ApiError::Internal(err.to_string()),
            DeathError::Session(session_err) => session_err.into(),
            DeathError::Scheduler(dispatch_err) => dispatch_err.into(),
        }
    }
}

impl From<GameEngineError> for ApiError {
    fn from(err: GameEngineError) -> Self {
        match err {
            GameEngineError::Session(err) => err.into(),
            GameEngineError::Turn(err) => err.into(),
            GameEngineError::Dispatch(err) => err.into(),
            GameEngineError::Death(err) => err.into(),
        }
    }
}
