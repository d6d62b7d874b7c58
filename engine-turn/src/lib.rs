#![deny(missing_docs)]
//! Turn Pipeline — the two-phase per-turn state machine.
//!
//! Phase A (consequence and image) is the only place that ever writes
//! `state.json`/`history.json`; Phase B (next choices) is a pure
//! derivation of the state Phase A just committed. Every external
//! generator failure degrades gracefully except a history-append I/O
//! failure, which aborts the turn before any state is saved.

mod pipeline;
mod types;

pub use pipeline::{TurnPipeline, EVOLVER_FALLBACK_SUMMARY, NARRATIVE_FALLBACK_DISPATCH};
pub use types::{PhaseAResult, PhaseBResult, TurnTrigger};
