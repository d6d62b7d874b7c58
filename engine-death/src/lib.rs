#![deny(missing_docs)]
//! Death/Restart Orchestrator — assembles a replay artifact when a turn
//! marks the player terminal, then races a manual "play again" click
//! against an automatic restart deadline.
//!
//! The at-most-once restart guarantee shares its compare-and-set
//! primitive ([`engine_core::ResolveOnce`]) with the Countdown
//! Coordinator — both are the same shape (exactly one of two competing
//! resolutions wins) — while keeping a distinct outcome vocabulary
//! ([`RestartOutcome`] vs `engine_countdown::CountdownOutcome`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use engine_core::{
    EngineConfig, FrameRef, GeneratorError, ReplayAssembler, ResolveOnce, SessionError, SessionId,
};
use engine_frames::FrameRegistry;
use engine_scheduler::{Scheduler, SchedulerEvent};
use tokio::sync::Notify;

/// Which event resolved a death's restart race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The player clicked "play again" before the deadline.
    Manual,
    /// The restart deadline elapsed with no click.
    Deadline,
}

/// Returned by [`DeathOrchestrator::begin`]: the persisted replay tape
/// and the deadline the caller should present as a countdown.
#[derive(Debug, Clone)]
pub struct DeathResult {
    /// Identifier of the persisted replay artifact, as returned by
    /// `SessionStore::save_replay_tape`.
    pub tape_name: String,
    /// How long the `PlayAgain` affordance has before auto-restart.
    pub restart_deadline: engine_core::DurationMs,
}

/// Everything that can keep a death sequence from completing.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DeathError {
    /// Too few frames were recorded to assemble a meaningful replay.
    #[error("not enough frames recorded for a replay: have {have}, need at least {required}")]
    NotEnoughFrames {
        /// Frames actually recorded.
        have: usize,
        /// Minimum required, per `EngineConfig::min_frames_for_replay`.
        required: usize,
    },
    /// The external Replay Assembler failed.
    #[error("replay assembly failed: {0}")]
    Replay(#[from] GeneratorError),
    /// The Session Store failed to persist the tape.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The Scheduler failed to carry out the resulting `Restart`.
    #[error(transparent)]
    Scheduler(#[from] engine_scheduler::DispatchError),
}

struct RestartGate {
    resolved: ResolveOnce<RestartOutcome>,
    notify: Notify,
}

impl RestartGate {
    fn new() -> Self {
        Self {
            resolved: ResolveOnce::new(),
            notify: Notify::new(),
        }
    }
}

/// Coordinates one session's death sequence: replay assembly, tape
/// persistence, and the at-most-once manual-vs-deadline restart race.
pub struct DeathOrchestrator {
    frames: Arc<FrameRegistry>,
    store: Arc<dyn engine_core::SessionStore>,
    scheduler: Arc<Scheduler>,
    replay: Arc<dyn ReplayAssembler>,
    config: EngineConfig,
    gates: StdMutex<HashMap<SessionId, Arc<RestartGate>>>,
}

impl DeathOrchestrator {
    /// Wire an orchestrator over its collaborators.
    pub fn new(
        frames: Arc<FrameRegistry>,
        store: Arc<dyn engine_core::SessionStore>,
        scheduler: Arc<Scheduler>,
        replay: Arc<dyn ReplayAssembler>,
        config: EngineConfig,
    ) -> Self {
        Self {
            frames,
            store,
            scheduler,
            replay,
            config,
            gates: StdMutex::new(HashMap::new()),
        }
    }

    /// Begin a death sequence for `session`: snapshot frames, require at
    /// least `min_frames_for_replay`, assemble and persist a replay tape,
    /// and arm a fresh restart gate. Call once per death; a second call
    /// before the prior restart resolves replaces the gate (the prior
    /// race's winner, if any, still performs its restart).
    pub async fn begin(&self, session: &SessionId) -> Result<DeathResult, DeathError> {
        let frames: Vec<FrameRef> = self.frames.snapshot(session).await;
        if frames.len() < self.config.min_frames_for_replay {
            return Err(DeathError::NotEnoughFrames {
                have: frames.len(),
                required: self.config.min_frames_for_replay,
            });
        }

        let artifact = self
            .replay
            .assemble(&frames, self.config.replay_size_budget_bytes)
            .await?;
        let tape_name = self.store.save_replay_tape(session, &artifact).await?;

        self.gates
            .lock()
            .expect("death gates mutex poisoned")
            .insert(session.clone(), Arc::new(RestartGate::new()));

        tracing::info!(session = %session, frames = frames.len(), "engine.death.begin");

        Ok(DeathResult {
            tape_name,
            restart_deadline: self.config.restart_deadline,
        })
    }

    /// The player clicked `PlayAgain`. Returns whether this call won the
    /// restart race; the actual `Restart` is carried out by whichever
    /// task is awaiting [`DeathOrchestrator::race_restart`] for this
    /// session, which wakes on this call.
    pub fn trigger_restart(&self, session: &SessionId) -> bool {
        let Some(gate) = self.gate_for(session) else {
            return false;
        };
        let won = gate.resolved.try_resolve(RestartOutcome::Manual).is_some();
        gate.notify.notify_waiters();
        won
    }

    /// Race the restart deadline against a manual trigger. Resolves
    /// exactly once and performs the `Restart` itself (cancel in-flight
    /// work, reset state, clear frames) before returning.
    pub async fn race_restart(&self, session: &SessionId) -> Result<RestartOutcome, DeathError> {
        let Some(gate) = self.gate_for(session) else {
            return Err(DeathError::Session(SessionError::NotFound(session.to_string())));
        };

        if let Some(outcome) = gate.resolved.winner() {
            return Ok(outcome);
        }

        let sleep = tokio::time::sleep(self.config.restart_deadline.to_std());
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                _ = &mut sleep => {
                    let outcome = gate
                        .resolved
                        .try_resolve(RestartOutcome::Deadline)
                        .unwrap_or_else(|| gate.resolved.winner().expect("resolved by a concurrent caller"));
                    self.finish_restart(session).await?;
                    return Ok(outcome);
                }
                _ = gate.notify.notified() => {
                    if let Some(outcome) = gate.resolved.winner() {
                        self.finish_restart(session).await?;
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    async fn finish_restart(&self, session: &SessionId) -> Result<(), DeathError> {
        self.scheduler.cancel_in_flight(session);
        self.scheduler
            .dispatch(session.clone(), SchedulerEvent::Restart)
            .await?;
        tracing::info!(session = %session, "engine.death.restart");
        Ok(())
    }

    fn gate_for(&self, session: &SessionId) -> Option<Arc<RestartGate>> {
        self.gates.lock().expect("death gates mutex poisoned").get(session).cloned()
    }
}
