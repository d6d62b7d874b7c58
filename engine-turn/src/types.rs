//! Request and result types the Turn Pipeline's two phases exchange with
//! whatever dispatches them (the Session Scheduler).

use engine_core::Fate;

/// What triggered this turn. Carries everything [`crate::TurnPipeline`]
/// needs to resolve fate and choose the history record's `is_custom_action`
/// flag, without the caller reaching into state itself.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum TurnTrigger {
    /// A player-selected or free-typed choice. Fate is resolved fresh via
    /// the `FateResolver`.
    PlayerChoice {
        /// The choice text, or the player's free-typed action.
        choice_text: String,
        /// Whether `choice_text` was free-text rather than one of the
        /// three offered choices.
        is_custom: bool,
    },
    /// The countdown's deadline fired with no player input. Fate is fixed
    /// to `Normal` — never resolved via dice for this trigger kind.
    TimeoutPenalty {
        /// The timeout-penalty phrase carried over from the prior
        /// Phase-B result.
        penalty_text: String,
    },
}

impl TurnTrigger {
    /// The text that becomes `HistoryEntry::choice`.
    pub fn choice_text(&self) -> &str {
        match self {
            TurnTrigger::PlayerChoice { choice_text, .. } => choice_text,
            TurnTrigger::TimeoutPenalty { penalty_text } => penalty_text,
        }
    }

    /// Whether this trigger counts as a custom (free-text) action.
    /// Always `false` for a timeout penalty.
    pub fn is_custom_action(&self) -> bool {
        matches!(self, TurnTrigger::PlayerChoice { is_custom: true, .. })
    }
}

/// Phase A's result: the fast-visible consequence, the (possibly absent)
/// generated frame, and the fate/transition flags Phase B and the
/// Countdown Coordinator need.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct PhaseAResult {
    /// Short narrative consequence.
    pub dispatch: String,
    /// What the player is shown.
    pub vision: String,
    /// Path to the generated frame, or `None` if image generation failed
    /// or was skipped.
    pub image_path: Option<String>,
    /// The fate modifier applied (`Normal` for a timeout penalty).
    pub fate: Fate,
    /// Whether the player survives this turn.
    pub player_alive: bool,
    /// Whether this turn's outcome moved the player to a new location.
    pub hard_transition: bool,
    /// Set when the World Evolver degraded (kept the previous world
    /// prompt, emitted the fallback evolution summary) rather than erred
    /// out. Informational only — the turn still committed.
    pub world_evolver_degraded: bool,
}

/// Phase B's result: the next three choices plus the phrase to dispatch
/// if the countdown's deadline fires unanswered. Never mutates state —
/// a pure derivation from the post-Phase-A state.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct PhaseBResult {
    /// Exactly three short action phrases.
    pub choices: [String; 3],
    /// The phrase used as the next turn's `TimeoutPenalty` choice text.
    pub penalty: String,
}
