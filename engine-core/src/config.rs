//! Tunables every component treats as "configurable, e.g. ...". Loading
//! this from a file or environment is the caller's job — this crate only
//! defines the shape and its defaults.

use serde::{Deserialize, Serialize};

use crate::duration::DurationMs;

/// Every tunable the design calls out as configurable, collected in one
/// place so a caller can load it once (TOML, env, whatever it likes) and
/// hand it to every component.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Countdown/Timeout Coordinator deadline `D`.
    pub countdown_deadline: DurationMs,
    /// Death/Restart Orchestrator restart deadline `R`.
    pub restart_deadline: DurationMs,
    /// Reference Buffer's `N` — number of prior frames collected absent a
    /// hard transition.
    pub reference_set_size: usize,
    /// Base image-generation timeout (the `30s` in `30s + 10s * refs`).
    pub image_timeout_base: DurationMs,
    /// Additional image-generation timeout per reference frame.
    pub image_timeout_per_ref: DurationMs,
    /// Ceiling the dynamic image-generation timeout is clamped to.
    pub image_timeout_max: DurationMs,
    /// Fixed narrative-generator timeout.
    pub narrative_timeout: DurationMs,
    /// World Evolver condensation period, in turns.
    pub condensation_period_turns: u32,
    /// `recent_events` cap under normal operation.
    pub recent_events_cap: usize,
    /// `recent_events` lower watermark applied every `condensation_period_turns`.
    pub recent_events_condensed_cap: usize,
    /// `seen_elements` cap under normal operation.
    pub seen_elements_cap: usize,
    /// `seen_elements` lower watermark applied every `condensation_period_turns`.
    pub seen_elements_condensed_cap: usize,
    /// World Evolver's transient-description length-enforcement ceiling,
    /// in words, before a condensation request is made.
    pub evolver_description_word_ceiling: usize,
    /// Target word range the evolver condenses an over-long description
    /// into, expressed as `(min, max)`.
    pub evolver_condensed_word_range: (usize, usize),
    /// Minimum frame count required for a replay artifact to be
    /// assembled at Death.
    pub min_frames_for_replay: usize,
    /// Size budget, in bytes, passed to the external Replay Assembler.
    /// Frames are never dropped to fit this budget.
    pub replay_size_budget_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            countdown_deadline: DurationMs::from_secs(15),
            restart_deadline: DurationMs::from_secs(30),
            reference_set_size: 1,
            image_timeout_base: DurationMs::from_secs(30),
            image_timeout_per_ref: DurationMs::from_secs(10),
            image_timeout_max: DurationMs::from_secs(120),
            narrative_timeout: DurationMs::from_secs(20),
            condensation_period_turns: 30,
            recent_events_cap: 10,
            recent_events_condensed_cap: 8,
            seen_elements_cap: 50,
            seen_elements_condensed_cap: 40,
            evolver_description_word_ceiling: 100,
            evolver_condensed_word_range: (50, 70),
            min_frames_for_replay: 2,
            replay_size_budget_bytes: 20 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    /// Compute the dynamic image-generation timeout for a given reference
    /// count: `base + per_ref * refs`, clamped to `image_timeout_max`.
    pub fn image_timeout_for(&self, reference_count: usize) -> DurationMs {
        let scaled = DurationMs::from_millis(
            self.image_timeout_per_ref.as_millis() * reference_count as u64,
        );
        self.image_timeout_base
            .saturating_add(scaled)
            .clamp_max(self.image_timeout_max)
    }
}
