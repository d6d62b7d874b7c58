#![deny(missing_docs)]
//! Session Scheduler — one logical worker per session, atomic admission
//! control, and cooperative cancellation of the in-flight turn.
//!
//! Dispatches to one long-lived task per session via
//! `Arc<dyn SessionStore>` collaborators, in the same "hand a cloned
//! `Arc` to a `tokio::spawn`ed task" shape an in-process dispatcher
//! uses for single calls — generalized here from one task per call to
//! one task per session that drains its own channel for as long as the
//! session is active.
//!
//! Admission is **not** the channel. A full channel would accept one
//! event while a turn is running and let the worker pick it up next —
//! that is queuing, not rejection. A second `PlayerChoice` while a turn
//! is in flight must be rejected outright, so admission is gated by an
//! explicit `AtomicBool` checked (via `compare_exchange`) before the
//! event is ever handed to the channel; the channel's capacity of 1
//! exists only to carry the admitted event to the worker task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use engine_core::{SchedulerError, SessionId, SessionStore, TurnError};
use engine_frames::FrameRegistry;
use engine_turn::{PhaseAResult, PhaseBResult, TurnPipeline, TurnTrigger};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// The event kinds the scheduler admits. Mirrors spec 4.5 exactly:
/// `PlayerChoice` runs a full turn, `TimeoutPenalty` runs Phase A with a
/// fixed `Normal` fate, `Restart` bypasses admission control entirely.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A player-selected or free-typed choice.
    PlayerChoice {
        /// The choice text, or the player's free-typed action.
        choice_text: String,
        /// Whether `choice_text` was free text rather than one of the
        /// three offered choices.
        is_custom: bool,
    },
    /// The countdown's deadline fired unanswered.
    TimeoutPenalty {
        /// The timeout-penalty phrase carried over from the prior
        /// Phase-B result.
        penalty_text: String,
    },
    /// Cancel any in-flight phase, clear the Frame Buffer, and reset
    /// state to fresh defaults.
    Restart,
}

/// The scheduler's result for one dispatched event.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// A `PlayerChoice`/`TimeoutPenalty` turn ran to completion.
    Turn {
        /// Phase A's result.
        phase_a: PhaseAResult,
        /// Phase B's result, omitted when the player died this turn —
        /// no further choices are offered until Restart.
        phase_b: Option<PhaseBResult>,
    },
    /// A `Restart` event ran to completion.
    Restarted,
}

/// Everything that can go wrong dispatching one event: admission
/// rejection (this crate's own concern) or a failure surfaced by the
/// Turn Pipeline itself.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The scheduler itself rejected or cancelled the event.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// The Turn Pipeline failed while running the admitted event.
    #[error(transparent)]
    Turn(#[from] TurnError),
}

struct Work {
    event: SchedulerEvent,
    reply: oneshot::Sender<Result<TurnOutcome, DispatchError>>,
}

struct SessionWorker {
    in_flight: AtomicBool,
    cancel: StdMutex<CancellationToken>,
    tx: mpsc::Sender<Work>,
}

/// Holds one [`SessionWorker`] per active session and dispatches events
/// to it, subject to at-most-one-in-flight admission control.
pub struct Scheduler {
    pipeline: Arc<TurnPipeline>,
    store: Arc<dyn SessionStore>,
    frames: Arc<FrameRegistry>,
    workers: StdMutex<HashMap<SessionId, Arc<SessionWorker>>>,
}

impl Scheduler {
    /// Wire a scheduler over its turn pipeline, session store, and
    /// frame registry. The store and frame registry are needed directly
    /// (not just via the pipeline) because `Restart` bypasses the
    /// pipeline entirely.
    pub fn new(pipeline: Arc<TurnPipeline>, store: Arc<dyn SessionStore>, frames: Arc<FrameRegistry>) -> Self {
        Self {
            pipeline,
            store,
            frames,
            workers: StdMutex::new(HashMap::new()),
        }
    }

    /// Dispatch one event for `session`. `Restart` always runs,
    /// bypassing admission control; every other event is rejected with
    /// `DispatchError::Scheduler(SchedulerError::Rejected)` if a turn is
    /// already in flight for this session.
    pub async fn dispatch(&self, session: SessionId, event: SchedulerEvent) -> Result<TurnOutcome, DispatchError> {
        if matches!(event, SchedulerEvent::Restart) {
            return self.restart(&session).await;
        }

        let worker = self.worker_for(&session);
        if worker
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(session = %session, "engine.scheduler.admit.rejected");
            return Err(SchedulerError::Rejected.into());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if worker.tx.try_send(Work { event, reply: reply_tx }).is_err() {
            worker.in_flight.store(false, Ordering::SeqCst);
            return Err(SchedulerError::Rejected.into());
        }

        tracing::debug!(session = %session, "engine.scheduler.admit.accepted");
        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(SchedulerError::Cancelled.into()),
        }
    }

    /// Cancel any in-flight turn for `session`, if one exists. Exposed
    /// for callers (the Death Orchestrator) that need to tear a session
    /// down without going through `Restart`'s state reset.
    pub fn cancel_in_flight(&self, session: &SessionId) {
        if let Some(worker) = self.workers.lock().expect("scheduler workers mutex poisoned").get(session) {
            worker.cancel.lock().expect("cancel token mutex poisoned").cancel();
        }
    }

    async fn restart(&self, session: &SessionId) -> Result<TurnOutcome, DispatchError> {
        self.cancel_in_flight(session);

        self.store.reset_session(session).await.map_err(TurnError::from)?;
        self.frames.clear(session).await;

        if let Some(worker) = self.workers.lock().expect("scheduler workers mutex poisoned").get(session) {
            worker.in_flight.store(false, Ordering::SeqCst);
            *worker.cancel.lock().expect("cancel token mutex poisoned") = CancellationToken::new();
        }

        tracing::info!(session = %session, "engine.scheduler.restart");
        Ok(TurnOutcome::Restarted)
    }

    fn worker_for(&self, session: &SessionId) -> Arc<SessionWorker> {
        let mut workers = self.workers.lock().expect("scheduler workers mutex poisoned");
        if let Some(worker) = workers.get(session) {
            return Arc::clone(worker);
        }

        let (tx, rx) = mpsc::channel(1);
        let worker = Arc::new(SessionWorker {
            in_flight: AtomicBool::new(false),
            cancel: StdMutex::new(CancellationToken::new()),
            tx,
        });
        workers.insert(session.clone(), Arc::clone(&worker));
        self.spawn_worker_loop(session.clone(), Arc::clone(&worker), rx);
        worker
    }

    fn spawn_worker_loop(&self, session: SessionId, worker: Arc<SessionWorker>, mut rx: mpsc::Receiver<Work>) {
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            while let Some(Work { event, reply }) = rx.recv().await {
                let cancel = CancellationToken::new();
                *worker.cancel.lock().expect("cancel token mutex poisoned") = cancel.clone();

                let result = run_one(&pipeline, &session, event, &cancel).await;
                worker.in_flight.store(false, Ordering::SeqCst);
                let _ = reply.send(result);
            }
        });
    }
}

async fn run_one(
    pipeline: &TurnPipeline,
    session: &SessionId,
    event: SchedulerEvent,
    cancel: &CancellationToken,
) -> Result<TurnOutcome, DispatchError> {
    let trigger = match event {
        SchedulerEvent::PlayerChoice { choice_text, is_custom } => {
            TurnTrigger::PlayerChoice { choice_text, is_custom }
        }
        SchedulerEvent::TimeoutPenalty { penalty_text } => TurnTrigger::TimeoutPenalty { penalty_text },
        SchedulerEvent::Restart => unreachable!("Restart is handled before the worker queue"),
    };

    let phase_a = pipeline.run_phase_a(session, trigger, cancel).await?;
    let phase_b = if phase_a.player_alive {
        Some(pipeline.run_phase_b(session).await?)
    } else {
        None
    };

    Ok(TurnOutcome::Turn { phase_a, phase_b })
}
