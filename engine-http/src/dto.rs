//! Request/response bodies for the §6 HTTP surface. Every type here is a
//! thin, serde-derived wrapper around the domain types `engine` and
//! `engine-core` already define — no orchestration logic lives here.

use serde::{Deserialize, Serialize};

use engine::engine_core::SessionMetadata;
use engine::engine_death::DeathResult;
use engine::engine_turn::PhaseAResult;
use engine::TurnSubmission;

/// `POST /api/sessions` request body.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Display name.
    pub name: String,
    /// Optional freeform description.
    pub description: Option<String>,
    /// Optional explicit session id; a v4 UUID is generated if absent.
    pub session_id: Option<String>,
}

/// `GET /api/sessions` query parameters.
#[derive(Debug, Deserialize, Default)]
pub struct ListSessionsQuery {
    /// One of `last_accessed` (default), `created_at`, `name`.
    pub sort: Option<String>,
    /// Maximum number of sessions to return. Defaults to 50.
    pub limit: Option<usize>,
}

/// Session metadata as rendered over the wire.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The session's validated identifier.
    pub session_id: String,
    /// Display name.
    pub name: String,
    /// Optional freeform description.
    pub description: Option<String>,
    /// UTC creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// UTC timestamp of the most recent state write.
    pub last_accessed: chrono::DateTime<chrono::Utc>,
    /// Mirrors `WorldState::turn_count`.
    pub turn_count: u32,
    /// Mirrors `WorldState::player_state.alive`.
    pub player_alive: bool,
    /// Metadata schema version.
    pub version: String,
}

impl From<SessionMetadata> for SessionResponse {
    fn from(meta: SessionMetadata) -> Self {
        Self {
            session_id: meta.session_id.to_string(),
            name: meta.name,
            description: meta.description,
            created_at: meta.created_at,
            last_accessed: meta.last_accessed,
            turn_count: meta.turn_count,
            player_alive: meta.player_alive,
            version: meta.version,
        }
    }
}

/// `GET /api/sessions/{id}/status` response: the compact status §6 asks
/// for, distinct from the full [`SessionResponse`].
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// The session's validated identifier.
    pub session_id: String,
    /// Mirrors `WorldState::turn_count`.
    pub turn_count: u32,
    /// Mirrors `WorldState::player_state.alive`.
    pub player_alive: bool,
}

/// `POST /api/game/intro` and `POST /api/game/action/choices` request
/// body. Both only need a session id: intro has no Phase-A input to
/// carry, and `action/choices` re-serves the cached Phase-B result for
/// the turn that already ran.
#[derive(Debug, Deserialize)]
pub struct ChoicesRequest {
    /// The session this request applies to.
    pub session_id: String,
}

/// `POST /api/game/intro` and `POST /api/game/action/choices` response
/// body: the three choices, the timeout-penalty phrase, and the
/// countdown deadline the UI should race against them.
#[derive(Debug, Serialize)]
pub struct ChoicesResponse {
    /// Exactly three short action phrases.
    pub choices: [String; 3],
    /// The phrase dispatched as `TimeoutPenalty` if the countdown's
    /// deadline fires unanswered.
    pub timeout_penalty: String,
    /// The countdown deadline, in milliseconds, this response's choices
    /// are racing against.
    pub countdown_deadline_ms: u64,
}

/// `POST /api/game/action/image` request body (Phase A).
#[derive(Debug, Deserialize)]
pub struct ActionImageRequest {
    /// The session this request applies to.
    pub session_id: String,
    /// The choice text (or free-typed custom action).
    pub choice_text: String,
    /// Whether `choice_text` is free-typed rather than one of the three
    /// offered choices.
    #[serde(default)]
    pub is_custom: bool,
}

/// `POST /api/game/action/image` response body: Phase A's consequence
/// and image, plus the death-sequence details when this turn was fatal.
#[derive(Debug, Serialize)]
pub struct ActionImageResponse {
    /// Short narrative consequence.
    pub dispatch: String,
    /// What the player is shown.
    pub vision: String,
    /// Path to the generated frame, or `None` if image generation failed.
    pub image_path: Option<String>,
    /// The fate modifier applied this turn.
    pub fate: String,
    /// Whether the player survives this turn.
    pub player_alive: bool,
    /// Whether this turn's outcome moved the player to a new location.
    pub hard_transition: bool,
    /// Present exactly when `player_alive` is `false`: the replay tape
    /// identifier and the restart deadline to present as a countdown.
    pub death: Option<DeathResponse>,
}

/// The death-sequence details nested in [`ActionImageResponse`].
#[derive(Debug, Serialize)]
pub struct DeathResponse {
    /// Identifier of the persisted replay artifact.
    pub tape_name: String,
    /// How long the `PlayAgain` affordance has before auto-restart, in
    /// milliseconds.
    pub restart_deadline_ms: u64,
}

impl From<DeathResult> for DeathResponse {
    fn from(result: DeathResult) -> Self {
        Self {
            tape_name: result.tape_name,
            restart_deadline_ms: result.restart_deadline.as_millis(),
        }
    }
}

impl From<TurnSubmission> for ActionImageResponse {
    fn from(submission: TurnSubmission) -> Self {
        let PhaseAResult {
            dispatch,
            vision,
            image_path,
            fate,
            player_alive,
            hard_transition,
            ..
        } = submission.phase_a;
        Self {
            dispatch,
            vision,
            image_path,
            fate: format!("{fate:?}").to_uppercase(),
            player_alive,
            hard_transition,
            death: submission.death.map(DeathResponse::from),
        }
    }
}
