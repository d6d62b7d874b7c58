//! The Session Store protocol — per-session directory layout, atomic
//! state/history writes, session CRUD, metadata.

use async_trait::async_trait;

use crate::error::SessionError;
use crate::id::SessionId;
use crate::model::{HistoryEntry, SessionMetadata, WorldState};

/// Sort key for [`SessionStore::list_sessions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Most recently accessed first.
    LastAccessed,
    /// Most recently created first.
    CreatedAt,
    /// Lexicographic by name.
    Name,
}

/// Owns the directory layout and provides atomic, serialized access to
/// state, metadata, and history for every session.
///
/// Implementations:
/// - `engine-state-fs::FsSessionStore` — filesystem-backed, atomic
///   `*.tmp` + rename writes.
/// - `engine-state-memory::MemorySessionStore` — in-memory, for tests.
///
/// All writes to a given session go through a per-session lock held for
/// the whole read-modify-write; writes across distinct sessions are
/// independent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load current state. On a missing or unparseable file, returns a
    /// fresh default state and writes it out (the caller never observes
    /// a partial state).
    async fn load_state(&self, id: &SessionId) -> Result<WorldState, SessionError>;

    /// Atomically persist `state`: serialize to `state.json.tmp`, fsync,
    /// rename over `state.json`. Updates `last_saved`, and mirrors
    /// `turn_count`/`player_alive` into the session's metadata, touching
    /// `last_accessed`.
    async fn save_state(&self, id: &SessionId, state: &WorldState) -> Result<(), SessionError>;

    /// Load the full turn history, oldest first.
    async fn load_history(&self, id: &SessionId) -> Result<Vec<HistoryEntry>, SessionError>;

    /// Load at most the last `n` entries of history, oldest-first within
    /// the returned slice. `None` returns the full history.
    async fn get_history(
        &self,
        id: &SessionId,
        last_n: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, SessionError>;

    /// Append one entry to history. Must be atomic with the same
    /// temp-then-rename protocol as `save_state`.
    async fn append_history(
        &self,
        id: &SessionId,
        entry: HistoryEntry,
    ) -> Result<(), SessionError>;

    /// Create a session. If `id` is `None`, a fresh v4 UUID is generated.
    /// An explicit id colliding with an existing session fails with
    /// `AlreadyExists`.
    async fn create_session(
        &self,
        name: &str,
        description: Option<&str>,
        id: Option<SessionId>,
    ) -> Result<SessionMetadata, SessionError>;

    /// List session metadata, sorted by `sort`, truncated to `limit`.
    async fn list_sessions(
        &self,
        sort: SortKey,
        limit: usize,
    ) -> Result<Vec<SessionMetadata>, SessionError>;

    /// Fetch one session's metadata.
    async fn get_session(&self, id: &SessionId) -> Result<SessionMetadata, SessionError>;

    /// Delete a session's entire directory tree. Refuses the reserved
    /// `default` id.
    async fn delete_session(&self, id: &SessionId) -> Result<(), SessionError>;

    /// Reset a session to fresh defaults (load-defaults-and-write),
    /// without deleting it. Used by Restart.
    async fn reset_session(&self, id: &SessionId) -> Result<(), SessionError>;

    /// Persist a replay artifact's bytes into the session's `tapes/`
    /// directory (or equivalent). Returns a tape identifier the caller
    /// can use to reference the stored artifact; never a full path, so
    /// implementations stay free to lay out storage however they like.
    async fn save_replay_tape(&self, id: &SessionId, bytes: &[u8]) -> Result<String, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_store_is_object_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<std::sync::Arc<dyn SessionStore>>();
    }
}
