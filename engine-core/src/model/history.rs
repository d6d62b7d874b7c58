//! Append-only turn history, persisted at `<session>/history.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Modifier applied to narrative generation, never to timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Fate {
    /// A small concrete positive twist must appear in the dispatch.
    Lucky,
    /// No modifier text.
    Normal,
    /// A severe concrete complication must appear.
    Unlucky,
}

/// One completed turn. Created at the end of a successful Turn Pipeline
/// execution and never mutated afterward.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based turn number, equal to this entry's position in history.
    pub turn: u32,
    /// The choice text (or timeout-penalty phrase) that produced this turn.
    pub choice: String,
    /// Whether `choice` was free-text player input rather than one of the
    /// offered choices.
    pub is_custom_action: bool,
    /// The fate modifier applied (always `Normal` for `TimeoutPenalty`).
    pub fate: Fate,
    /// Short narrative consequence.
    pub dispatch: String,
    /// What the player was shown.
    pub vision: String,
    /// Path to the generated frame, or `None` if image generation failed.
    pub image_path: Option<String>,
    /// Copy of `world_prompt` at turn end.
    pub world_prompt_snapshot: String,
    /// Whether this turn's outcome moved the player to a new location.
    pub hard_transition: bool,
    /// UTC creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fate_round_trips_as_uppercase() {
        assert_eq!(serde_json::to_string(&Fate::Lucky).unwrap(), "\"LUCKY\"");
        assert_eq!(serde_json::to_string(&Fate::Normal).unwrap(), "\"NORMAL\"");
        assert_eq!(serde_json::to_string(&Fate::Unlucky).unwrap(), "\"UNLUCKY\"");
    }
}
