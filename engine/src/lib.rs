#![deny(missing_docs)]
//! # engine — the turn orchestration core's facade crate
//!
//! [`GameEngine`] owns one instance of every constituent component (the
//! Session Store, Frame Buffer, World Evolver, Turn Pipeline, Session
//! Scheduler, Countdown Coordinator, and Death/Restart Orchestrator) and
//! exposes the handful of per-trigger operations an embedder drives —
//! create a session, submit a choice, wait out a countdown, play again —
//! as single calls, so no caller has to learn the wiring between them.
//!
//! Every constituent crate is also re-exported, so an embedder that needs
//! a lower-level type (a generator trait to implement, `EngineConfig` to
//! build) never has to add its own path dependency on top of this one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use engine_core::{
    ChoiceGenerator, EngineConfig, EvolverGenerator, FateResolver, ImageGenerator,
    NarrativeGenerator, ReplayAssembler, SessionError, SessionId, SessionMetadata, SessionStore,
    SortKey, TurnError, WallClock,
};
pub use engine_core::BRANDING_FRAME_PATH;
use engine_countdown::{Countdown, CountdownOutcome};
use engine_death::{DeathError, DeathOrchestrator, DeathResult, RestartOutcome};
use engine_frames::FrameRegistry;
use engine_scheduler::{DispatchError, Scheduler, SchedulerEvent, TurnOutcome};
use engine_turn::{PhaseAResult, PhaseBResult, TurnPipeline};
use engine_world::Evolver;

pub use engine_core;
pub use engine_countdown;
pub use engine_death;
#[cfg(feature = "fate")]
pub use engine_fate;
pub use engine_frames;
pub use engine_reference;
pub use engine_scheduler;
#[cfg(feature = "state-fs")]
pub use engine_state_fs;
#[cfg(feature = "state-memory")]
pub use engine_state_memory;
#[cfg(feature = "testing")]
pub use engine_testkit;
pub use engine_turn;
pub use engine_world;

/// The combined result of submitting a `PlayerChoice`/`TimeoutPenalty`
/// trigger: Phase A's consequence, Phase B's next choices (absent when
/// the player died this turn), and the death sequence's replay/restart
/// details when this turn ended the game.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct TurnSubmission {
    /// Phase A's result.
    pub phase_a: PhaseAResult,
    /// Phase B's result, `None` exactly when `phase_a.player_alive` is
    /// `false`.
    pub phase_b: Option<PhaseBResult>,
    /// Set when this turn killed the player: the assembled replay tape
    /// and the restart deadline to present as a countdown.
    pub death: Option<DeathResult>,
}

/// Everything [`GameEngine`]'s operations can fail with.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GameEngineError {
    /// The Session Store rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The Turn Pipeline failed outside of the Scheduler's admission path
    /// (used by [`GameEngine::start_intro`], which bypasses dispatch).
    #[error(transparent)]
    Turn(#[from] TurnError),
    /// The Scheduler rejected or failed to run the dispatched event.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// The Death/Restart Orchestrator failed to complete a death sequence.
    #[error(transparent)]
    Death(#[from] DeathError),
}

/// Owns one instance of every turn-orchestration component for a process,
/// and exposes the operations an HTTP (or other) front end drives.
pub struct GameEngine {
    config: EngineConfig,
    store: Arc<dyn SessionStore>,
    frames: Arc<FrameRegistry>,
    pipeline: Arc<TurnPipeline>,
    scheduler: Arc<Scheduler>,
    death: Arc<DeathOrchestrator>,
    countdowns: StdMutex<HashMap<SessionId, Arc<Countdown>>>,
    last_choices: StdMutex<HashMap<SessionId, PhaseBResult>>,
}

impl GameEngine {
    /// Wire an engine over the five external generators, a session store,
    /// a fate resolver, a wall clock, and a config. This is the one place
    /// every component's construction order matters: the World Evolver
    /// wraps the evolver generator, the Turn Pipeline wraps the Evolver
    /// plus the remaining generators, the Scheduler wraps the Turn
    /// Pipeline, and the Death Orchestrator wraps the Scheduler.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SessionStore>,
        narrative: Arc<dyn NarrativeGenerator>,
        image: Arc<dyn ImageGenerator>,
        choices: Arc<dyn ChoiceGenerator>,
        evolver_generator: Arc<dyn EvolverGenerator>,
        replay: Arc<dyn ReplayAssembler>,
        fate: Arc<dyn FateResolver>,
        clock: Arc<dyn WallClock>,
        config: EngineConfig,
    ) -> Self {
        let frames = Arc::new(FrameRegistry::new());
        let evolver = Arc::new(Evolver::new(evolver_generator, config.clone()));
        let pipeline = Arc::new(TurnPipeline::new(
            Arc::clone(&store),
            Arc::clone(&frames),
            evolver,
            fate,
            clock,
            narrative,
            image,
            choices,
            config.clone(),
        ));
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&pipeline),
            Arc::clone(&store),
            Arc::clone(&frames),
        ));
        let death = Arc::new(DeathOrchestrator::new(
            Arc::clone(&frames),
            Arc::clone(&store),
            Arc::clone(&scheduler),
            replay,
            config.clone(),
        ));

        Self {
            config,
            store,
            frames,
            pipeline,
            scheduler,
            death,
            countdowns: StdMutex::new(HashMap::new()),
            last_choices: StdMutex::new(HashMap::new()),
        }
    }

    /// The tunables this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a session explicitly (as opposed to the implicit
    /// creation-on-first-access most `SessionStore` implementations
    /// offer).
    pub async fn create_session(
        &self,
        name: &str,
        description: Option<&str>,
        id: Option<SessionId>,
    ) -> Result<SessionMetadata, SessionError> {
        self.store.create_session(name, description, id).await
    }

    /// List known sessions.
    pub async fn list_sessions(
        &self,
        sort: SortKey,
        limit: usize,
    ) -> Result<Vec<SessionMetadata>, SessionError> {
        self.store.list_sessions(sort, limit).await
    }

    /// Fetch one session's metadata.
    pub async fn get_session(&self, session: &SessionId) -> Result<SessionMetadata, SessionError> {
        self.store.get_session(session).await
    }

    /// Delete a session and forget any in-memory countdown/choices state
    /// for it. The default session cannot be deleted — see
    /// `SessionStore::delete_session`.
    pub async fn delete_session(&self, session: &SessionId) -> Result<(), SessionError> {
        self.cancel_countdown(session);
        self.forget_choices(session);
        self.store.delete_session(session).await
    }

    /// Produce the opening set of choices for a session that has not yet
    /// taken a turn. Bypasses the Scheduler entirely — there is no turn
    /// in flight to admit or reject.
    pub async fn start_intro(&self, session: &SessionId) -> Result<PhaseBResult, TurnError> {
        let result = self.pipeline.start_intro(session).await?;
        self.remember_choices(session, result.clone());
        Ok(result)
    }

    /// Submit a player choice (or free-typed custom action) as this
    /// session's next turn. Cancels any countdown in flight for the
    /// session first, since a player answer always supersedes the
    /// deadline race it would otherwise be competing with.
    pub async fn submit_choice(
        &self,
        session: &SessionId,
        choice_text: impl Into<String>,
        is_custom: bool,
    ) -> Result<TurnSubmission, GameEngineError> {
        self.cancel_countdown(session);
        let event = SchedulerEvent::PlayerChoice {
            choice_text: choice_text.into(),
            is_custom,
        };
        self.run_turn(session, event).await
    }

    /// Submit the countdown's timeout penalty as this session's next
    /// turn, using the penalty phrase from the most recently produced
    /// Phase-B result. Fails with [`TurnError::InvalidState`] if no
    /// Phase-B result has been produced yet for this session.
    pub async fn submit_timeout(&self, session: &SessionId) -> Result<TurnSubmission, GameEngineError> {
        let penalty_text = self
            .last_choices
            .lock()
            .expect("game engine choices cache poisoned")
            .get(session)
            .map(|result| result.penalty.clone())
            .ok_or_else(|| {
                TurnError::InvalidState(format!(
                    "no Phase-B result recorded yet for session {session}"
                ))
            })?;

        let event = SchedulerEvent::TimeoutPenalty { penalty_text };
        self.run_turn(session, event).await
    }

    /// Explicitly reset a session: cancel any in-flight turn and
    /// countdown, clear the Frame Buffer, and restore fresh state. Unlike
    /// [`GameEngine::play_again`], this does not require a death sequence
    /// to be in progress.
    pub async fn restart(&self, session: &SessionId) -> Result<(), GameEngineError> {
        self.cancel_countdown(session);
        self.forget_choices(session);
        self.scheduler
            .dispatch(session.clone(), SchedulerEvent::Restart)
            .await?;
        Ok(())
    }

    /// Record that the player clicked "play again" for a session whose
    /// death sequence is in progress. Returns whether this call won the
    /// restart race against the automatic deadline; either way, the
    /// actual restart is carried out by whichever call is awaiting
    /// [`GameEngine::wait_for_death_restart`] for this session.
    pub fn play_again(&self, session: &SessionId) -> bool {
        self.death.trigger_restart(session)
    }

    /// Race a session's death sequence: the restart deadline against a
    /// manual [`GameEngine::play_again`] call. Resolves exactly once and
    /// performs the restart itself before returning.
    pub async fn wait_for_death_restart(&self, session: &SessionId) -> Result<RestartOutcome, DeathError> {
        self.death.race_restart(session).await
    }

    /// The most recently produced Phase-B result cached for `session`, if
    /// any. Lets a caller split "run the turn" and "read its choices"
    /// across two separate round trips without re-deriving anything.
    pub fn cached_choices(&self, session: &SessionId) -> Option<PhaseBResult> {
        self.last_choices
            .lock()
            .expect("game engine choices cache poisoned")
            .get(session)
            .cloned()
    }

    /// Start a countdown for a session's just-produced Phase-B choices,
    /// replacing any countdown already running for it.
    pub fn begin_countdown(&self, session: &SessionId) -> Arc<Countdown> {
        let countdown = Countdown::new(self.config.countdown_deadline);
        self.countdowns
            .lock()
            .expect("game engine countdowns mutex poisoned")
            .insert(session.clone(), Arc::clone(&countdown));
        countdown
    }

    /// Race the countdown currently running for a session, if any.
    pub async fn race_countdown(&self, session: &SessionId) -> Option<CountdownOutcome> {
        let countdown = self
            .countdowns
            .lock()
            .expect("game engine countdowns mutex poisoned")
            .get(session)
            .cloned()?;
        Some(countdown.race().await)
    }

    /// Resolve a session's running countdown with player input. Returns
    /// `false` if there is no countdown running, or if it already
    /// resolved.
    pub fn resolve_countdown_input(&self, session: &SessionId, choice: impl Into<String>) -> bool {
        match self
            .countdowns
            .lock()
            .expect("game engine countdowns mutex poisoned")
            .get(session)
        {
            Some(countdown) => countdown.resolve_player_input(choice),
            None => false,
        }
    }

    /// The Frame Buffer, for callers (the image/replay/tape HTTP handlers)
    /// that need a session's recorded frames directly.
    pub fn frames(&self) -> &Arc<FrameRegistry> {
        &self.frames
    }

    /// The underlying Session Store, for callers that need direct access
    /// beyond the per-trigger operations above (serving a persisted
    /// replay tape, for instance).
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    async fn run_turn(
        &self,
        session: &SessionId,
        event: SchedulerEvent,
    ) -> Result<TurnSubmission, GameEngineError> {
        let outcome = self.scheduler.dispatch(session.clone(), event).await?;
        match outcome {
            TurnOutcome::Turn { phase_a, phase_b } => {
                match phase_b.clone() {
                    Some(result) => self.remember_choices(session, result),
                    None => self.forget_choices(session),
                }

                let death = if phase_a.player_alive {
                    None
                } else {
                    Some(self.death.begin(session).await?)
                };

                Ok(TurnSubmission {
                    phase_a,
                    phase_b,
                    death,
                })
            }
            TurnOutcome::Restarted => {
                unreachable!("Restart is dispatched via GameEngine::restart, never run_turn")
            }
        }
    }

    fn cancel_countdown(&self, session: &SessionId) {
        if let Some(countdown) = self
            .countdowns
            .lock()
            .expect("game engine countdowns mutex poisoned")
            .remove(session)
        {
            countdown.cancel();
        }
    }

    fn remember_choices(&self, session: &SessionId, result: PhaseBResult) {
        self.last_choices
            .lock()
            .expect("game engine choices cache poisoned")
            .insert(session.clone(), result);
    }

    fn forget_choices(&self, session: &SessionId) {
        self.last_choices
            .lock()
            .expect("game engine choices cache poisoned")
            .remove(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::DurationMs;
    use engine_fate::RandomFateResolver;
    use engine_state_memory::MemorySessionStore;
    use engine_testkit::{FakeReplayAssembler, FrozenClock, ScriptedChoices, ScriptedEvolver, ScriptedImage, ScriptedNarrative};
    use engine_core::{EvolutionResult, NarrativeResult};

    fn harness() -> GameEngine {
        let narrative = Arc::new(ScriptedNarrative::new(vec![NarrativeResult {
            dispatch: "You press onward.".to_string(),
            vision: "A corridor stretches ahead.".to_string(),
            player_alive_after: true,
            hard_transition: false,
        }]));
        let image = Arc::new(ScriptedImage::new(vec!["frame-1".to_string()]));
        let choices = Arc::new(ScriptedChoices::new(vec![engine_core::ChoiceResult {
            choices: ["Go left".into(), "Go right".into(), "Wait".into()],
            timeout_penalty: "You freeze up.".into(),
        }]));
        let evolver = Arc::new(ScriptedEvolver::new(vec![EvolutionResult {
            world_prompt: "The world continues.".to_string(),
            evolution_summary: "Something shifts.".to_string(),
            discovered_entities: vec![],
        }]));
        let replay = Arc::new(FakeReplayAssembler);

        GameEngine::new(
            Arc::new(MemorySessionStore::new()),
            narrative,
            image,
            choices,
            evolver,
            replay,
            Arc::new(RandomFateResolver::new()),
            Arc::new(FrozenClock::new()),
            {
                let mut config = EngineConfig::default();
                config.countdown_deadline = DurationMs::from_millis(50);
                config
            },
        )
    }

    #[tokio::test]
    async fn intro_then_choice_round_trips_through_the_facade() {
        let engine = harness();
        let session = SessionId::parse("alpha").unwrap();

        let intro = engine.start_intro(&session).await.unwrap();
        assert_eq!(intro.choices.len(), 3);

        let submission = engine.submit_choice(&session, "Go left", false).await.unwrap();
        assert!(submission.phase_a.player_alive);
        assert!(submission.phase_b.is_some());
        assert!(submission.death.is_none());
    }

    #[tokio::test]
    async fn timeout_without_prior_choices_is_invalid_state() {
        let engine = harness();
        let session = SessionId::parse("alpha").unwrap();
        let err = engine.submit_timeout(&session).await.unwrap_err();
        assert!(matches!(err, GameEngineError::Turn(TurnError::InvalidState(_))));
    }

    #[tokio::test]
    async fn second_choice_while_first_in_flight_is_rejected() {
        let engine = Arc::new(harness());
        let session = SessionId::parse("alpha").unwrap();
        engine.start_intro(&session).await.unwrap();

        let a = Arc::clone(&engine);
        let session_a = session.clone();
        let first = tokio::spawn(async move { a.submit_choice(&session_a, "Go left", false).await });

        let second = engine.submit_choice(&session, "Go right", false).await;
        let first = first.await.unwrap();

        let outcomes = [first.is_ok(), second.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn deleting_a_session_forgets_its_cached_choices() {
        let engine = harness();
        let session = SessionId::parse("alpha").unwrap();
        engine.create_session("Alpha", None, Some(session.clone())).await.unwrap();
        engine.start_intro(&session).await.unwrap();
        engine.delete_session(&session).await.unwrap();

        let err = engine.submit_timeout(&session).await.unwrap_err();
        assert!(matches!(err, GameEngineError::Turn(TurnError::InvalidState(_))));
    }
}
