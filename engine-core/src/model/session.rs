//! Session metadata, persisted at `<session>/meta.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::SessionId;

/// Small record stored at `<session>/meta.json`. Mirrors a subset of
/// [`crate::model::WorldState`] (`turn_count`, `player_alive`) so a caller
/// can list sessions without loading full state.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// The session's validated identifier.
    pub session_id: SessionId,
    /// Display name.
    pub name: String,
    /// Optional freeform description.
    pub description: Option<String>,
    /// UTC creation timestamp.
    pub created_at: DateTime<Utc>,
    /// UTC timestamp of the most recent state write, updated on every
    /// `SaveState`.
    pub last_accessed: DateTime<Utc>,
    /// Mirrors `WorldState::turn_count`.
    pub turn_count: u32,
    /// Mirrors `WorldState::player_state.alive`.
    pub player_alive: bool,
    /// Metadata schema version.
    pub version: String,
}

impl SessionMetadata {
    /// Current metadata schema version this crate writes.
    pub const CURRENT_VERSION: &'static str = "1";

    /// Construct fresh metadata for a newly created session.
    pub fn new(
        session_id: SessionId,
        name: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            name: name.into(),
            description,
            created_at: now,
            last_accessed: now,
            turn_count: 0,
            player_alive: true,
            version: Self::CURRENT_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metadata_starts_fresh() {
        let now = Utc::now();
        let meta = SessionMetadata::new(SessionId::default_session(), "Run 1", None, now);
        assert_eq!(meta.turn_count, 0);
        assert!(meta.player_alive);
        assert_eq!(meta.created_at, meta.last_accessed);
    }
}
