//! Deterministic fakes for every external generator trait, plus a fixed
//! fate resolver and a frozen clock, for use in the workspace's own test
//! suites.

#![deny(missing_docs)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use engine_core::{
    ChoiceGenerator, ChoiceResult, Clock, EvolutionResult, EvolverGenerator, Fate, FateResolver,
    GeneratorError, ImageGenerator, Instant, NarrativeBundle, NarrativeGenerator, NarrativeResult,
    ReplayAssembler, TurnEvent, WallClock, WorldSnapshot, WorldState,
};

/// A fate resolver that always returns the same configured value.
pub struct FixedFateResolver(Fate);

impl FixedFateResolver {
    /// Always resolve to `fate`.
    pub fn new(fate: Fate) -> Self {
        Self(fate)
    }
}

impl FateResolver for FixedFateResolver {
    fn resolve(&self) -> Fate {
        self.0
    }
}

/// A clock frozen at construction time. `now()` never advances; `utc_now()`
/// never advances.
pub struct FrozenClock {
    instant: Instant,
    utc: DateTime<Utc>,
}

impl FrozenClock {
    /// Freeze at the current real time.
    pub fn new() -> Self {
        Self {
            instant: Instant::now(),
            utc: Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp"),
        }
    }

    /// Freeze at a specific UTC timestamp (seconds since epoch).
    pub fn at_unix_secs(secs: i64) -> Self {
        Self {
            instant: Instant::now(),
            utc: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
        }
    }
}

impl Default for FrozenClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> Instant {
        self.instant
    }
}

impl WallClock for FrozenClock {
    fn utc_now(&self) -> DateTime<Utc> {
        self.utc
    }
}

/// A queue of responses returned one at a time; panics if exhausted. The
/// same "script and replay" shape used for every generator fake below.
struct Script<T> {
    remaining: Mutex<Vec<T>>,
}

impl<T> Script<T> {
    fn new(responses: Vec<T>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            remaining: Mutex::new(responses),
        }
    }

    fn next(&self, who: &str) -> T {
        self.remaining
            .lock()
            .expect("script mutex poisoned")
            .pop()
            .unwrap_or_else(|| panic!("{who} script exhausted"))
    }
}

/// Returns a queued sequence of [`NarrativeResult`]s.
pub struct ScriptedNarrative(Script<NarrativeResult>);

impl ScriptedNarrative {
    /// Build a fake that returns each of `responses` in order, one per call.
    pub fn new(responses: Vec<NarrativeResult>) -> Self {
        Self(Script::new(responses))
    }
}

#[async_trait]
impl NarrativeGenerator for ScriptedNarrative {
    async fn generate(&self, _bundle: NarrativeBundle) -> Result<NarrativeResult, GeneratorError> {
        Ok(self.0.next("narrative"))
    }
}

/// Always fails with a configured error, for exercising Phase A's
/// retry-then-fallback path.
pub struct FailingNarrative(GeneratorError);

impl FailingNarrative {
    /// Always fail with `error`.
    pub fn new(error: GeneratorError) -> Self {
        Self(error)
    }
}

#[async_trait]
impl NarrativeGenerator for FailingNarrative {
    async fn generate(&self, _bundle: NarrativeBundle) -> Result<NarrativeResult, GeneratorError> {
        Err(self.0.clone())
    }
}

/// Returns a queued sequence of frame paths.
pub struct ScriptedImage(Script<String>);

impl ScriptedImage {
    /// Build a fake that returns each of `paths` in order, one per call.
    pub fn new(paths: Vec<String>) -> Self {
        Self(Script::new(paths))
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImage {
    async fn generate(
        &self,
        _prompt: &str,
        _references: &[engine_core::FrameRef],
    ) -> Result<engine_core::FrameRef, GeneratorError> {
        Ok(engine_core::FrameRef::new(self.0.next("image")))
    }
}

/// Always fails with a configured error.
pub struct FailingImage(GeneratorError);

impl FailingImage {
    /// Always fail with `error`.
    pub fn new(error: GeneratorError) -> Self {
        Self(error)
    }
}

#[async_trait]
impl ImageGenerator for FailingImage {
    async fn generate(
        &self,
        _prompt: &str,
        _references: &[engine_core::FrameRef],
    ) -> Result<engine_core::FrameRef, GeneratorError> {
        Err(self.0.clone())
    }
}

/// Returns a queued sequence of [`ChoiceResult`]s.
pub struct ScriptedChoices(Script<ChoiceResult>);

impl ScriptedChoices {
    /// Build a fake that returns each of `responses` in order, one per call.
    pub fn new(responses: Vec<ChoiceResult>) -> Self {
        Self(Script::new(responses))
    }
}

#[async_trait]
impl ChoiceGenerator for ScriptedChoices {
    async fn generate(&self, _snapshot: WorldSnapshot) -> Result<ChoiceResult, GeneratorError> {
        Ok(self.0.next("choices"))
    }
}

/// Returns a queued sequence of [`EvolutionResult`]s.
pub struct ScriptedEvolver(Script<EvolutionResult>);

impl ScriptedEvolver {
    /// Build a fake that returns each of `responses` in order, one per call.
    pub fn new(responses: Vec<EvolutionResult>) -> Self {
        Self(Script::new(responses))
    }
}

#[async_trait]
impl EvolverGenerator for ScriptedEvolver {
    async fn evolve(
        &self,
        _prev: &WorldState,
        _event: &TurnEvent,
    ) -> Result<EvolutionResult, GeneratorError> {
        Ok(self.0.next("evolver"))
    }
}

/// Always fails with a configured error.
pub struct FailingEvolver(GeneratorError);

impl FailingEvolver {
    /// Always fail with `error`.
    pub fn new(error: GeneratorError) -> Self {
        Self(error)
    }
}

#[async_trait]
impl EvolverGenerator for FailingEvolver {
    async fn evolve(
        &self,
        _prev: &WorldState,
        _event: &TurnEvent,
    ) -> Result<EvolutionResult, GeneratorError> {
        Err(self.0.clone())
    }
}

/// Assembles a trivial non-empty artifact from however many frames it is
/// given, never failing.
pub struct FakeReplayAssembler;

#[async_trait]
impl ReplayAssembler for FakeReplayAssembler {
    async fn assemble(
        &self,
        frames: &[engine_core::FrameRef],
        _size_budget_bytes: u64,
    ) -> Result<Vec<u8>, GeneratorError> {
        Ok(format!("replay:{}", frames.len()).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_fate_resolver_always_returns_configured_value() {
        let resolver = FixedFateResolver::new(Fate::Normal);
        assert_eq!(resolver.resolve(), Fate::Normal);
        assert_eq!(resolver.resolve(), Fate::Normal);
    }

    #[test]
    fn frozen_clock_does_not_advance() {
        let clock = FrozenClock::new();
        let first = Clock::now(&clock);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = Clock::now(&clock);
        assert_eq!(first, second);
    }

    #[tokio::test]
    #[should_panic(expected = "narrative script exhausted")]
    async fn scripted_narrative_panics_when_exhausted() {
        let fake = ScriptedNarrative::new(vec![]);
        let bundle = NarrativeBundle {
            world_prompt: String::new(),
            last_vision: None,
            choice: String::new(),
            fate: Fate::Normal,
            seen_elements: vec![],
            recent_events: vec![],
        };
        let _ = fake.generate(bundle).await;
    }
}
