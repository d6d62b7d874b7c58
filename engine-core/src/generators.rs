//! External generator interfaces (§6). These are the only boundary this
//! core has to the narrative text generator, the image generator, the
//! choice-list generator, the world evolver, and the replay assembler —
//! all five are explicitly out of scope to implement for real; this crate
//! only defines the contract they must satisfy.
//!
//! Every trait is `async_trait` and object-safe: the Turn Pipeline holds
//! all five as `Arc<dyn Trait>` fields side by side, so none of them can
//! be generic over a single implementation the way a single-role provider
//! boundary could be.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::model::{Fate, FrameRef, WorldState};

/// Everything the narrative generator needs to produce a Phase-A
/// consequence and vision.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeBundle {
    /// Current accumulated world narrative.
    pub world_prompt: String,
    /// What the player was last shown, if any.
    pub last_vision: Option<String>,
    /// The choice text (or custom action) driving this turn.
    pub choice: String,
    /// The fate modifier to weave into the dispatch.
    pub fate: Fate,
    /// Discovered entity names, for continuity.
    pub seen_elements: Vec<String>,
    /// Recent action/consequence records, for continuity.
    pub recent_events: Vec<String>,
}

/// Structured narrative response.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeResult {
    /// Short narrative consequence.
    pub dispatch: String,
    /// What the player sees now.
    pub vision: String,
    /// Whether the player survives this turn.
    pub player_alive_after: bool,
    /// Whether this choice implies a location change.
    pub hard_transition: bool,
}

/// Generates Phase-A narrative consequences. Explicitly out of scope to
/// implement for real — the core only consumes this trait.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Produce a structured narrative response for one turn.
    async fn generate(&self, bundle: NarrativeBundle) -> Result<NarrativeResult, GeneratorError>;
}

/// Generates (or interpolates) Phase-A images. Per the Open Question in
/// the design notes, a video-interpolation generator is interchangeable
/// with a still-image generator at this boundary.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one frame from a prompt and a set of prior frames used
    /// for visual continuity.
    async fn generate(
        &self,
        prompt: &str,
        references: &[FrameRef],
    ) -> Result<FrameRef, GeneratorError>;
}

/// A read-only view of world state handed to the choice generator. Never
/// mutated.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Current accumulated world narrative.
    pub world_prompt: String,
    /// The dispatch from the turn that just completed.
    pub last_dispatch: String,
    /// The vision from the turn that just completed.
    pub last_vision: String,
    /// Discovered entity names.
    pub seen_elements: Vec<String>,
}

/// Three next-action phrases plus the phrase to use if the countdown
/// expires unanswered.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceResult {
    /// Exactly three short action phrases.
    pub choices: [String; 3],
    /// The phrase dispatched as `TimeoutPenalty`'s choice text if the
    /// countdown's deadline fires.
    pub timeout_penalty: String,
}

/// Generates Phase-B next-choices.
#[async_trait]
pub trait ChoiceGenerator: Send + Sync {
    /// Produce the next three choices and the timeout-penalty phrase.
    async fn generate(&self, snapshot: WorldSnapshot) -> Result<ChoiceResult, GeneratorError>;
}

/// What just happened, handed to the World Evolver's external generator.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEvent {
    /// The choice that drove this turn.
    pub choice: String,
    /// The narrative consequence produced in Phase A.
    pub dispatch: String,
    /// What the player was shown in Phase A.
    pub vision: String,
    /// Optional vision analysis of the prior frame, for grounding.
    pub prior_vision_analysis: Option<String>,
    /// 1-based turn number this event corresponds to.
    pub turn_number: u32,
}

/// The evolver generator's raw output, before entity-extraction and
/// bounded-buffer merging are applied by the World Evolver component.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Mutated world narrative (1200-1500 target words).
    pub world_prompt: String,
    /// 15-25 word second-person atmospheric delta.
    pub evolution_summary: String,
    /// Newly discovered entity names, in generator-reported order.
    pub discovered_entities: Vec<String>,
}

/// Mutates world narrative given the previous state and what just
/// happened. Consumed only by the World Evolver, under the session's
/// write lock.
#[async_trait]
pub trait EvolverGenerator: Send + Sync {
    /// Evolve `prev` given `event`.
    async fn evolve(
        &self,
        prev: &WorldState,
        event: &TurnEvent,
    ) -> Result<EvolutionResult, GeneratorError>;
}

/// Assembles a replay artifact from a session's recorded frames.
#[async_trait]
pub trait ReplayAssembler: Send + Sync {
    /// Produce an artifact from `frames`, constrained by
    /// `size_budget_bytes`. Frames are never dropped to fit the budget —
    /// dimensions and color palette may be reduced instead. An error
    /// describes the case where even minimum quality exceeds the budget.
    async fn assemble(
        &self,
        frames: &[FrameRef],
        size_budget_bytes: u64,
    ) -> Result<Vec<u8>, GeneratorError>;
}
