//! The two-phase per-turn state machine itself.

use std::sync::Arc;

use engine_core::{
    ChoiceGenerator, ChoiceResult, EngineConfig, Fate, FateResolver, FrameRef, HistoryEntry,
    ImageGenerator, NarrativeBundle, NarrativeGenerator, NarrativeResult, SessionId, SessionStore,
    TurnError, TurnEvent, WallClock, WorldSnapshot, WorldState, BRANDING_FRAME_PATH,
};
use engine_frames::FrameRegistry;
use engine_world::Evolver;
use tokio_util::sync::CancellationToken;

use crate::types::{PhaseAResult, PhaseBResult, TurnTrigger};

/// The deterministic fallback dispatch used when the narrative generator
/// fails twice in a row (an initial call plus one retry).
pub const NARRATIVE_FALLBACK_DISPATCH: &str = "You make a tense move in the chaos.";

/// The `evolution_summary` substituted when the World Evolver's generator
/// call fails. The turn still commits.
pub const EVOLVER_FALLBACK_SUMMARY: &str = "The world shifts around you.";

/// Phase-B's fallback choices, used when the choice generator fails.
/// Phase B never mutates state, so a failure here never needs to abort a
/// turn that has already committed in Phase A — it degrades the same way
/// Phase A's own generator failures do.
const CHOICE_FALLBACK: [&str; 3] = [
    "Wait and watch.",
    "Press onward.",
    "Retreat carefully.",
];
const CHOICE_FALLBACK_PENALTY: &str = "You hesitate too long and are caught off guard.";

/// Runs exactly one turn for a session: Phase A (consequence and image),
/// then, if the player survived, Phase B (next choices).
///
/// Holds every collaborator the design wires together behind this
/// component — the Session Store, the Frame Buffer, the World Evolver,
/// the Fate Resolver, and the three remaining external generators — as
/// shared, cloneable handles, so one `TurnPipeline` can be shared across
/// every session's worker.
pub struct TurnPipeline {
    store: Arc<dyn SessionStore>,
    frames: Arc<FrameRegistry>,
    evolver: Arc<Evolver>,
    fate: Arc<dyn FateResolver>,
    clock: Arc<dyn WallClock>,
    narrative: Arc<dyn NarrativeGenerator>,
    image: Arc<dyn ImageGenerator>,
    choices: Arc<dyn ChoiceGenerator>,
    config: EngineConfig,
}

impl TurnPipeline {
    /// Wire a pipeline over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SessionStore>,
        frames: Arc<FrameRegistry>,
        evolver: Arc<Evolver>,
        fate: Arc<dyn FateResolver>,
        clock: Arc<dyn WallClock>,
        narrative: Arc<dyn NarrativeGenerator>,
        image: Arc<dyn ImageGenerator>,
        choices: Arc<dyn ChoiceGenerator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            frames,
            evolver,
            fate,
            clock,
            narrative,
            image,
            choices,
            config,
        }
    }

    /// Run Phase A: consequence, image, state mutation, history append.
    ///
    /// `cancel` is observed around every external-generator `.await` point;
    /// if it fires before the narrative/image calls resolve, no state is
    /// written, no history is appended, and no frame is recorded — this is
    /// the "cancelled turns leave nothing behind" guarantee the Session
    /// Scheduler depends on.
    pub async fn run_phase_a(
        &self,
        session: &SessionId,
        trigger: TurnTrigger,
        cancel: &CancellationToken,
    ) -> Result<PhaseAResult, TurnError> {
        let fate = match &trigger {
            TurnTrigger::PlayerChoice { .. } => self.fate.resolve(),
            TurnTrigger::TimeoutPenalty { .. } => Fate::Normal,
        };

        let prev_state = self.store.load_state(session).await?;
        if !prev_state.player_state.alive {
            return Err(TurnError::InvalidState(
                "no further turns are accepted while the player is dead".to_string(),
            ));
        }

        let next_turn = prev_state.turn_count + 1;
        let choice_text = trigger.choice_text().to_string();
        let action_record = format!("Turn {next_turn}: {choice_text}");
        let mut recent_events_for_bundle = prev_state.recent_events.clone();
        recent_events_for_bundle.push(action_record);

        tracing::debug!(session = %session, turn = next_turn, "engine.turn.phase_a.start");

        let narrative = self
            .generate_narrative(
                &prev_state,
                &choice_text,
                fate,
                &recent_events_for_bundle,
                cancel,
            )
            .await?;

        let history_so_far = self.store.load_history(session).await?;
        let references = if history_so_far.is_empty() {
            // Intro exception: the very first action passes every
            // available reference (typically the intro/branding frame).
            self.frames.snapshot(session).await
        } else {
            engine_reference::select_references(&history_so_far, self.config.reference_set_size)
        };

        let image_path = self
            .generate_image(&narrative.vision, &references, cancel)
            .await;

        let mut new_state = prev_state.clone();
        new_state.last_choice = Some(choice_text.clone());
        new_state.last_dispatch = Some(narrative.dispatch.clone());
        new_state.last_vision = Some(narrative.vision.clone());
        new_state.last_image_path = image_path.clone();
        new_state.last_hard_transition = narrative.hard_transition;
        new_state.turn_count = next_turn;
        new_state.player_state.alive = narrative.player_alive_after;
        if !narrative.player_alive_after {
            new_state.player_state.health = 0;
        }

        let event = TurnEvent {
            choice: choice_text.clone(),
            dispatch: narrative.dispatch.clone(),
            vision: narrative.vision.clone(),
            prior_vision_analysis: None,
            turn_number: next_turn,
        };

        let mut world_evolver_degraded = false;
        match self.evolver.evolve(&prev_state, &event).await {
            Ok(outcome) => {
                new_state.world_prompt = outcome.world_prompt;
                new_state.evolution_summary = outcome.evolution_summary;
                new_state.recent_events = outcome.recent_events;
                new_state.seen_elements = outcome.seen_elements;
            }
            Err(err) => {
                tracing::warn!(session = %session, error = %err, "engine.turn.phase_a.evolver_degraded");
                world_evolver_degraded = true;
                new_state.evolution_summary = EVOLVER_FALLBACK_SUMMARY.to_string();
                let mut recent_events = prev_state.recent_events.clone();
                recent_events.push(format!("Turn {next_turn}: {}", EVOLVER_FALLBACK_SUMMARY));
                while recent_events.len() > self.config.recent_events_cap {
                    recent_events.remove(0);
                }
                new_state.recent_events = recent_events;
            }
        }

        let history_entry = HistoryEntry {
            turn: next_turn,
            choice: choice_text,
            is_custom_action: trigger.is_custom_action(),
            fate,
            dispatch: narrative.dispatch.clone(),
            vision: narrative.vision.clone(),
            image_path: image_path.clone(),
            world_prompt_snapshot: new_state.world_prompt.clone(),
            hard_transition: narrative.hard_transition,
            created_at: self.clock.utc_now(),
        };

        // History append is the turn's commit point: a failure here
        // aborts with no state save and no frame append (§4.4's explicit
        // failure semantics for history I/O).
        self.store
            .append_history(session, history_entry)
            .await
            .map_err(|e| TurnError::TurnFailed(format!("history append failed: {e}")))?;

        self.store
            .save_state(session, &new_state)
            .await
            .map_err(|e| TurnError::TurnFailed(format!("state save failed: {e}")))?;

        // Frame append is best-effort, after the turn has already
        // committed — never allowed to fail the turn.
        if let Some(path) = &image_path {
            self.frames.append(session, FrameRef::new(path.clone())).await;
        }

        tracing::debug!(session = %session, turn = next_turn, "engine.turn.phase_a.done");

        Ok(PhaseAResult {
            dispatch: narrative.dispatch,
            vision: narrative.vision,
            image_path,
            fate,
            player_alive: narrative.player_alive_after,
            hard_transition: narrative.hard_transition,
            world_evolver_degraded,
        })
    }

    /// Produce the opening set of choices for a session that has not yet
    /// taken a turn, driven by `POST /api/game/intro`. Deliberately
    /// distinct from [`TurnPipeline::run_phase_b`]: calling Phase B on a
    /// session with no completed Phase A is `InvalidState` by design (§7),
    /// so the intro path builds its own snapshot from the fresh
    /// `world_prompt` rather than from `last_dispatch`/`last_vision`.
    pub async fn start_intro(&self, session: &SessionId) -> Result<PhaseBResult, TurnError> {
        let state = self.store.load_state(session).await?;

        // The branding/intro frame event (§3's Frame Buffer lifecycle,
        // source (i)): fires here and again on every post-Restart
        // re-entry into this same path, since Restart clears the Frame
        // Buffer down to nothing.
        if self.frames.count(session).await == 0 {
            self.frames
                .append(session, FrameRef::new(BRANDING_FRAME_PATH))
                .await;
        }

        let snapshot = WorldSnapshot {
            world_prompt: state.world_prompt.clone(),
            last_dispatch: String::new(),
            last_vision: String::new(),
            seen_elements: state.seen_elements.clone(),
        };

        let result = match self.choices.generate(snapshot).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(session = %session, error = %err, "engine.turn.intro.degraded");
                ChoiceResult {
                    choices: CHOICE_FALLBACK.map(str::to_string),
                    timeout_penalty: CHOICE_FALLBACK_PENALTY.to_string(),
                }
            }
        };

        Ok(PhaseBResult {
            choices: result.choices,
            penalty: result.timeout_penalty,
        })
    }

    /// Run Phase B: pure derivation of the next three choices from the
    /// post-Phase-A state. Never mutates state.
    pub async fn run_phase_b(&self, session: &SessionId) -> Result<PhaseBResult, TurnError> {
        let state = self.store.load_state(session).await?;
        let (Some(last_dispatch), Some(last_vision)) =
            (state.last_dispatch.clone(), state.last_vision.clone())
        else {
            return Err(TurnError::InvalidState(
                "phase B requested without a completed phase A".to_string(),
            ));
        };

        let snapshot = WorldSnapshot {
            world_prompt: state.world_prompt.clone(),
            last_dispatch,
            last_vision,
            seen_elements: state.seen_elements.clone(),
        };

        let result = match self.choices.generate(snapshot).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(session = %session, error = %err, "engine.turn.phase_b.degraded");
                ChoiceResult {
                    choices: CHOICE_FALLBACK.map(str::to_string),
                    timeout_penalty: CHOICE_FALLBACK_PENALTY.to_string(),
                }
            }
        };

        Ok(PhaseBResult {
            choices: result.choices,
            penalty: result.timeout_penalty,
        })
    }

    async fn generate_narrative(
        &self,
        prev_state: &WorldState,
        choice_text: &str,
        fate: Fate,
        recent_events: &[String],
        cancel: &CancellationToken,
    ) -> Result<NarrativeResult, TurnError> {
        let bundle = NarrativeBundle {
            world_prompt: prev_state.world_prompt.clone(),
            last_vision: prev_state.last_vision.clone(),
            choice: choice_text.to_string(),
            fate,
            seen_elements: prev_state.seen_elements.clone(),
            recent_events: recent_events.to_vec(),
        };

        match self.call_narrative(bundle.clone(), cancel).await {
            Ok(result) => return Ok(result),
            Err(err) if err.is_cancelled() => return Err(TurnError::Cancelled),
            Err(_) => {}
        }

        tracing::warn!("engine.turn.phase_a.narrative_retry");
        let reduced = NarrativeBundle {
            last_vision: None,
            recent_events: Vec::new(),
            ..bundle
        };
        match self.call_narrative(reduced, cancel).await {
            Ok(result) => Ok(result),
            Err(err) if err.is_cancelled() => Err(TurnError::Cancelled),
            Err(_) => {
                tracing::warn!("engine.turn.phase_a.narrative_fallback");
                Ok(NarrativeResult {
                    dispatch: NARRATIVE_FALLBACK_DISPATCH.to_string(),
                    vision: NARRATIVE_FALLBACK_DISPATCH.to_string(),
                    player_alive_after: true,
                    hard_transition: false,
                })
            }
        }
    }

    async fn call_narrative(
        &self,
        bundle: NarrativeBundle,
        cancel: &CancellationToken,
    ) -> Result<NarrativeResult, CallOutcome> {
        let call = tokio::time::timeout(
            self.config.narrative_timeout.to_std(),
            self.narrative.generate(bundle),
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CallOutcome::Cancelled),
            res = call => match res {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(_)) | Err(_) => Err(CallOutcome::Failed),
            },
        }
    }

    async fn generate_image(
        &self,
        vision: &str,
        references: &[FrameRef],
        cancel: &CancellationToken,
    ) -> Option<String> {
        let timeout = self.config.image_timeout_for(references.len());
        let call = tokio::time::timeout(timeout.to_std(), self.image.generate(vision, references));
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = call => res.ok().and_then(Result::ok),
        };

        match result {
            Some(frame) => Some(frame.as_str().to_string()),
            None => {
                tracing::warn!("engine.turn.phase_a.image_degraded");
                None
            }
        }
    }
}

enum CallOutcome {
    Cancelled,
    Failed,
}

impl CallOutcome {
    fn is_cancelled(&self) -> bool {
        matches!(self, CallOutcome::Cancelled)
    }
}
