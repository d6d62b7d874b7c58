#![deny(missing_docs)]
//! World Evolver — serialized mutation of the world narrative and the
//! bounded recent-events / seen-elements context, backed by an external
//! generator treated as a black box.
//!
//! Bounded collections are drop-oldest-keep-recent, in the same spirit
//! as a sliding context window: cap enforcement and periodic
//! condensation never block on the generator, they are plain
//! post-processing of whatever it returns.

use std::collections::VecDeque;
use std::sync::Arc;

use engine_core::{EngineConfig, EvolverGenerator, GeneratorError, TurnEvent, WorldState};

const GENERIC_TERMS: &[&str] = &[
    "ground", "sky", "wall", "walls", "floor", "ceiling", "air", "dust", "shadow", "shadows",
    "light", "darkness", "silence", "room", "corridor", "door", "doorway",
];

const THIRD_PERSON_PRONOUNS: &[&str] = &["he", "him", "his", "she", "her", "hers", "they", "them"];

/// The World Evolver's output for one turn: the fields it owns, plus
/// whether a content defect (third-person drift) was detected and
/// suppressed-but-accepted.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct EvolveOutcome {
    /// Mutated world narrative.
    pub world_prompt: String,
    /// One atmospheric, second-person sentence for this turn.
    pub evolution_summary: String,
    /// Updated `recent_events`, oldest first, capped.
    pub recent_events: Vec<String>,
    /// Updated `seen_elements`, newly discovered entities prepended,
    /// capped.
    pub seen_elements: Vec<String>,
    /// Whether third-person drift was detected in generator output.
    /// The text is still accepted; this is a signal for logging/metrics,
    /// never a reason to fail the turn.
    pub content_defect: bool,
}

/// Drives one external `EvolverGenerator` behind the bounded-buffer and
/// entity-extraction rules the World Evolver owns.
pub struct Evolver {
    generator: Arc<dyn EvolverGenerator>,
    config: EngineConfig,
}

impl Evolver {
    /// Build an evolver over `generator`, using `config` for cap and
    /// condensation-period tunables.
    pub fn new(generator: Arc<dyn EvolverGenerator>, config: EngineConfig) -> Self {
        Self { generator, config }
    }

    /// Evolve `prev` given `event`. Falls back to a deterministic
    /// truncation if the generator's description exceeds the configured
    /// word ceiling; never fails the turn on a length issue.
    pub async fn evolve(
        &self,
        prev: &WorldState,
        event: &TurnEvent,
    ) -> Result<EvolveOutcome, GeneratorError> {
        let result = self.generator.evolve(prev, event).await?;

        let content_defect = contains_third_person_drift(&result.evolution_summary)
            || contains_third_person_drift(&result.world_prompt);
        if content_defect {
            tracing::warn!(
                turn = event.turn_number,
                "world evolver output contains third-person drift; accepting anyway"
            );
        }

        let evolution_summary = enforce_length(&result.evolution_summary, &self.config);

        let mut recent_events: VecDeque<String> = prev.recent_events.iter().cloned().collect();
        recent_events.push_back(format!("Turn {}: {}", event.turn_number, event.choice));

        let mut seen_elements: VecDeque<String> = prev.seen_elements.iter().cloned().collect();
        for entity in extract_entities(&result.discovered_entities) {
            seen_elements.retain(|existing| existing != &entity);
            seen_elements.push_front(entity);
        }

        let is_condensation_turn = event.turn_number > 0
            && event.turn_number % self.config.condensation_period_turns == 0;
        let (recent_cap, seen_cap) = if is_condensation_turn {
            (
                self.config.recent_events_condensed_cap,
                self.config.seen_elements_condensed_cap,
            )
        } else {
            (self.config.recent_events_cap, self.config.seen_elements_cap)
        };

        while recent_events.len() > recent_cap {
            recent_events.pop_front();
        }
        while seen_elements.len() > seen_cap {
            seen_elements.pop_back();
        }

        Ok(EvolveOutcome {
            world_prompt: result.world_prompt,
            evolution_summary,
            recent_events: recent_events.into_iter().collect(),
            seen_elements: seen_elements.into_iter().collect(),
            content_defect,
        })
    }
}

/// Filters raw discovered-entity strings per the entity-extraction
/// rules: exclude generic environment terms, otherwise keep the
/// generator's own ordering (a well-behaved generator floats named
/// people/threats to the front already).
fn extract_entities(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            !GENERIC_TERMS.contains(&lower.as_str())
        })
        .cloned()
        .collect()
}

fn contains_third_person_drift(text: &str) -> bool {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .any(|word| THIRD_PERSON_PRONOUNS.contains(&word.as_str()))
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn truncate_to_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// Enforces the transient-description length ceiling. A real condensation
/// request would round-trip back through the generator; since
/// `EvolverGenerator` exposes a single `evolve` call per turn, an
/// over-long description is condensed with the same deterministic
/// truncation the design specifies as its own failure fallback.
fn enforce_length(description: &str, config: &EngineConfig) -> String {
    if word_count(description) <= config.evolver_description_word_ceiling {
        return description.to_string();
    }
    let (_, max) = config.evolver_condensed_word_range;
    truncate_to_words(description, max)
}
