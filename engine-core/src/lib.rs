//! # engine-core — protocol traits and domain types for the turn orchestration core
//!
//! This crate defines the data model and the boundary traits every other
//! crate in the workspace composes against. It owns no I/O and no async
//! runtime beyond the trait signatures themselves.
//!
//! ## The protocols
//!
//! | Protocol | Trait | What it does |
//! |----------|-------|--------------|
//! | Session Store | [`SessionStore`] | Per-session CRUD, atomic state/history persistence |
//! | Narrative | [`NarrativeGenerator`] | Consequence + vision for Phase A |
//! | Image | [`ImageGenerator`] | Frame generation for Phase A |
//! | Choices | [`ChoiceGenerator`] | Next-choices generation for Phase B |
//! | World Evolution | [`EvolverGenerator`] | World-prompt mutation |
//! | Replay | [`ReplayAssembler`] | Death-sequence artifact assembly |
//!
//! Every trait above is an `async_trait` object-safe trait: the Turn
//! Pipeline holds five different generator roles side by side as trait
//! objects, so none of them can be generic the way a single-role provider
//! boundary could be.
//!
//! ## Time
//!
//! [`Clock`] (monotonic) and [`WallClock`] (UTC) are kept as distinct
//! traits deliberately — deadlines and timestamps must never be read
//! from the same source, so there is no trait that offers both.

#![deny(missing_docs)]

pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod fate;
pub mod generators;
pub mod id;
pub mod model;
pub mod resolve_once;
pub mod session_store;

pub use clock::{Clock, Instant, SystemClock, WallClock};
pub use config::EngineConfig;
pub use duration::DurationMs;
pub use fate::FateResolver;
pub use error::{GeneratorError, SchedulerError, SessionError, TurnError};
pub use generators::{
    ChoiceGenerator, ChoiceResult, EvolutionResult, EvolverGenerator, ImageGenerator,
    NarrativeBundle, NarrativeResult, ReplayAssembler, TurnEvent, WorldSnapshot,
};
pub use id::SessionId;
pub use model::{
    Fate, FrameRef, HistoryEntry, PlayerState, SessionMetadata, WorldState, BRANDING_FRAME_PATH,
};
pub use resolve_once::ResolveOnce;
pub use session_store::{SessionStore, SortKey};
