//! Error taxonomy. One `thiserror` enum per protocol boundary, mirroring
//! the behavioral kinds (not mechanism) the design calls for.

use thiserror::Error;

/// Errors from the Session Store boundary.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed session id, filename, or request body.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Session or file not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Explicit session id collision on create.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Disk I/O failure. Bubbles up as a terminal turn failure.
    #[error("io failure: {0}")]
    Io(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Serialization(e.to_string())
    }
}

/// Errors from the Turn Pipeline.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TurnError {
    /// Turn accepted while the player is dead, or Phase B requested without
    /// a completed Phase A.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A persistent disk failure aborted the turn before any commit.
    #[error("turn failed: {0}")]
    TurnFailed(String),

    /// The turn was cancelled; no state was mutated.
    #[error("cancelled")]
    Cancelled,

    /// Propagated from the Session Store.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the Session Scheduler.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A turn is already in flight for this session; the event was rejected,
    /// not queued.
    #[error("rejected: a turn is already in flight for this session")]
    Rejected,

    /// The in-flight turn was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// The session does not exist.
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// Errors from any external generator call (narrative, image, choices,
/// evolver, replay).
///
/// `ContentDefect` is deliberately absent here — third-person drift and
/// length excursions are not errors, they are `tracing::warn!` events plus
/// accepted content, per the propagation policy.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
pub enum GeneratorError {
    /// The call exceeded its allotted timeout.
    #[error("generator timed out after {0}")]
    Timeout(crate::duration::DurationMs),

    /// The call was cancelled before it completed.
    #[error("generator call cancelled")]
    Cancelled,

    /// The generator returned a response the core could not use
    /// (malformed output, missing required field).
    #[error("generator failed: {0}")]
    Failed(String),
}

impl GeneratorError {
    /// Whether this failure is worth retrying once, per the Turn Pipeline's
    /// "retry once with reduced prompt" rule for the narrative generator.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeneratorError::Timeout(_) | GeneratorError::Failed(_))
    }
}
