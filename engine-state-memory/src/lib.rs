#![deny(missing_docs)]
//! In-memory implementation of `engine_core::SessionStore`.
//!
//! Each session owns its own `tokio::sync::Mutex`-guarded record; the
//! outer map is only locked briefly to look up or insert that per-session
//! entry, so concurrent turns on two different sessions never contend
//! with each other. Suitable for tests and scenario harnesses — no
//! persistence across process restarts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use engine_core::{
    HistoryEntry, SessionError, SessionId, SessionMetadata, SessionStore, SortKey, WorldState,
};
use tokio::sync::{Mutex, RwLock};

struct SessionRecord {
    meta: SessionMetadata,
    state: WorldState,
    history: Vec<HistoryEntry>,
    tapes: HashMap<String, Vec<u8>>,
}

/// In-memory `SessionStore`, backed by a `HashMap` of per-session locks.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionRecord>>>>,
}

impl MemorySessionStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn entry_for(&self, id: &SessionId) -> Arc<Mutex<SessionRecord>> {
        if let Some(existing) = self.sessions.read().await.get(id) {
            return Arc::clone(existing);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(id.clone()).or_insert_with(|| {
            let now = Utc::now();
            Arc::new(Mutex::new(SessionRecord {
                meta: SessionMetadata::new(id.clone(), id.as_str(), None, now),
                state: WorldState::fresh(now),
                history: Vec::new(),
                tapes: HashMap::new(),
            }))
        }))
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_state(&self, id: &SessionId) -> Result<WorldState, SessionError> {
        let record = self.entry_for(id).await;
        let guard = record.lock().await;
        Ok(guard.state.clone())
    }

    async fn save_state(&self, id: &SessionId, state: &WorldState) -> Result<(), SessionError> {
        let record = self.entry_for(id).await;
        let mut guard = record.lock().await;
        guard.state = state.clone();
        guard.meta.last_accessed = Utc::now();
        guard.meta.turn_count = state.turn_count;
        guard.meta.player_alive = state.player_state.alive;
        Ok(())
    }

    async fn load_history(&self, id: &SessionId) -> Result<Vec<HistoryEntry>, SessionError> {
        let record = self.entry_for(id).await;
        let guard = record.lock().await;
        Ok(guard.history.clone())
    }

    async fn get_history(
        &self,
        id: &SessionId,
        last_n: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, SessionError> {
        let history = self.load_history(id).await?;
        Ok(match last_n {
            Some(n) if n < history.len() => history[history.len() - n..].to_vec(),
            _ => history,
        })
    }

    async fn append_history(
        &self,
        id: &SessionId,
        entry: HistoryEntry,
    ) -> Result<(), SessionError> {
        let record = self.entry_for(id).await;
        let mut guard = record.lock().await;
        guard.history.push(entry);
        Ok(())
    }

    async fn create_session(
        &self,
        name: &str,
        description: Option<&str>,
        id: Option<SessionId>,
    ) -> Result<SessionMetadata, SessionError> {
        let id = id.unwrap_or_else(SessionId::generate);

        if self.sessions.read().await.contains_key(&id) {
            return Err(SessionError::AlreadyExists(id.to_string()));
        }

        let now = Utc::now();
        let meta = SessionMetadata::new(id.clone(), name, description.map(str::to_string), now);
        let record = SessionRecord {
            meta: meta.clone(),
            state: WorldState::fresh(now),
            history: Vec::new(),
            tapes: HashMap::new(),
        };

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(SessionError::AlreadyExists(id.to_string()));
        }
        sessions.insert(id, Arc::new(Mutex::new(record)));
        Ok(meta)
    }

    async fn list_sessions(
        &self,
        sort: SortKey,
        limit: usize,
    ) -> Result<Vec<SessionMetadata>, SessionError> {
        let sessions = self.sessions.read().await;
        let mut metas = Vec::with_capacity(sessions.len());
        for record in sessions.values() {
            metas.push(record.lock().await.meta.clone());
        }
        match sort {
            SortKey::LastAccessed => metas.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed)),
            SortKey::CreatedAt => metas.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortKey::Name => metas.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        metas.truncate(limit);
        Ok(metas)
    }

    async fn get_session(&self, id: &SessionId) -> Result<SessionMetadata, SessionError> {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(record) => Ok(record.lock().await.meta.clone()),
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), SessionError> {
        if id.is_default() {
            return Err(SessionError::InvalidInput(
                "the default session cannot be deleted".to_string(),
            ));
        }
        let mut sessions = self.sessions.write().await;
        if sessions.remove(id).is_none() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn reset_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let record = self.entry_for(id).await;
        let mut guard = record.lock().await;
        let now = Utc::now();
        guard.state = WorldState::fresh(now);
        guard.history.clear();
        guard.meta.turn_count = 0;
        guard.meta.player_alive = true;
        guard.meta.last_accessed = now;
        Ok(())
    }

    async fn save_replay_tape(&self, id: &SessionId, bytes: &[u8]) -> Result<String, SessionError> {
        let record = self.entry_for(id).await;
        let mut guard = record.lock().await;
        let name = format!("{}.bin", uuid::Uuid::new_v4());
        guard.tapes.insert(name.clone(), bytes.to_vec());
        Ok(name)
    }
}
