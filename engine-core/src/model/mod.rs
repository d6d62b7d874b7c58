//! The persisted data model: [`SessionMetadata`], [`WorldState`],
//! [`HistoryEntry`], [`FrameRef`].

mod frame;
mod history;
mod session;
mod world;

pub use frame::{FrameRef, BRANDING_FRAME_PATH};
pub use history::{Fate, HistoryEntry};
pub use session::SessionMetadata;
pub use world::{PlayerState, WorldState};
