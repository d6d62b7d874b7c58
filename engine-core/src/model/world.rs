//! World state, persisted at `<session>/state.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The opening narrative seed written into a fresh session's
/// `world_prompt` before any turn has run.
pub const INITIAL_WORLD_PROMPT: &str =
    "You awaken at the edge of a place you don't yet recognize. The air is still.";

/// `{alive: bool, health: int}`, health clamped to `[0, 100]`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
    /// Whether the player is alive. `false` blocks all further turns until
    /// Restart.
    pub alive: bool,
    /// Health in `[0, 100]`.
    pub health: u8,
}

impl PlayerState {
    /// A freshly spawned player: alive, full health.
    pub fn fresh() -> Self {
        Self {
            alive: true,
            health: 100,
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Persisted world state for one session.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    /// Accumulated narrative context, bounded to roughly 1200-1500 words
    /// by the World Evolver.
    pub world_prompt: String,
    /// 15-25 word player-facing atmospheric delta for the last turn.
    pub evolution_summary: String,
    /// Ordered sequence of at most 10 short action/consequence records.
    pub recent_events: Vec<String>,
    /// Ordered set of at most 50 discovered entity names. Named
    /// characters/threats are kept at the front.
    pub seen_elements: Vec<String>,
    /// Monotonically increasing turn counter. Equals `len(history)`.
    pub turn_count: u32,
    /// Player alive/health bookkeeping.
    pub player_state: PlayerState,
    /// Bookkeeping for the next turn: the choice text that produced this
    /// state.
    pub last_choice: Option<String>,
    /// Bookkeeping: the narrative consequence of `last_choice`.
    pub last_dispatch: Option<String>,
    /// Bookkeeping: what the player was last shown.
    pub last_vision: Option<String>,
    /// Bookkeeping: path to the most recently generated frame, if any.
    pub last_image_path: Option<String>,
    /// Bookkeeping: the kind of movement the last turn implied.
    pub last_movement_kind: Option<String>,
    /// Bookkeeping: whether the last turn was a hard transition.
    pub last_hard_transition: bool,
    /// UTC timestamp of the most recent atomic write.
    pub last_saved: DateTime<Utc>,
}

impl WorldState {
    /// Fresh default state for a brand-new (or reset) session.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            world_prompt: INITIAL_WORLD_PROMPT.to_string(),
            evolution_summary: String::new(),
            recent_events: Vec::new(),
            seen_elements: Vec::new(),
            turn_count: 0,
            player_state: PlayerState::fresh(),
            last_choice: None,
            last_dispatch: None,
            last_vision: None,
            last_image_path: None,
            last_movement_kind: None,
            last_hard_transition: false,
            last_saved: now,
        }
    }
}
