#![deny(missing_docs)]
//! Filesystem-backed implementation of `engine_core::SessionStore`.
//!
//! Directory layout:
//! ```text
//! root/
//!   sessions/
//!     <session-id>/
//!       meta.json
//!       state.json
//!       history.json
//! ```
//!
//! Every write goes through a temp file in the same directory followed by
//! a rename, so a reader never observes a half-written file — a crash
//! mid-write leaves either the old file or the new one, never a mix.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use engine_core::{
    HistoryEntry, SessionError, SessionId, SessionMetadata, SessionStore, SortKey, WorldState,
};
use tokio::sync::{Mutex, RwLock};

/// Filesystem-backed session store.
///
/// Suitable for development and single-machine deployments where session
/// data must survive process restarts.
pub struct FsSessionStore {
    root: PathBuf,
    locks: RwLock<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl FsSessionStore {
    /// Create a store rooted at `root`. The directory tree is created
    /// lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: RwLock::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, id: &SessionId) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.read().await.get(id) {
            return Arc::clone(existing);
        }
        let mut locks = self.locks.write().await;
        Arc::clone(locks.entry(id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.root.join("sessions").join(id.as_str())
    }

    fn meta_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("meta.json")
    }

    fn state_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("state.json")
    }

    fn history_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("history.json")
    }

    fn tapes_dir(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("tapes")
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<Option<T>, SessionError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json_atomic<T: serde::Serialize + Sync>(
        path: &Path,
        value: &T,
    ) -> Result<(), SessionError> {
        let dir = path.parent().expect("path has a parent directory");
        tokio::fs::create_dir_all(dir).await?;

        let tmp_path = dir.join(format!(
            "{}.{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("write"),
            uuid::Uuid::new_v4()
        ));
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    async fn load_meta_or_default(&self, id: &SessionId) -> Result<SessionMetadata, SessionError> {
        match Self::read_json::<SessionMetadata>(&self.meta_path(id)).await? {
            Some(meta) => Ok(meta),
            None => {
                let now = Utc::now();
                Ok(SessionMetadata::new(id.clone(), id.as_str(), None, now))
            }
        }
    }
}

#[async_trait]
impl SessionStore for FsSessionStore {
    async fn load_state(&self, id: &SessionId) -> Result<WorldState, SessionError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;
        match Self::read_json::<WorldState>(&self.state_path(id)).await? {
            Some(state) => Ok(state),
            None => {
                let state = WorldState::fresh(Utc::now());
                Self::write_json_atomic(&self.state_path(id), &state).await?;
                let meta = self.load_meta_or_default(id).await?;
                Self::write_json_atomic(&self.meta_path(id), &meta).await?;
                Ok(state)
            }
        }
    }

    async fn save_state(&self, id: &SessionId, state: &WorldState) -> Result<(), SessionError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        Self::write_json_atomic(&self.state_path(id), state).await?;

        let mut meta = self.load_meta_or_default(id).await?;
        meta.turn_count = state.turn_count;
        meta.player_alive = state.player_state.alive;
        meta.last_accessed = Utc::now();
        Self::write_json_atomic(&self.meta_path(id), &meta).await?;
        Ok(())
    }

    async fn load_history(&self, id: &SessionId) -> Result<Vec<HistoryEntry>, SessionError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;
        Ok(Self::read_json::<Vec<HistoryEntry>>(&self.history_path(id))
            .await?
            .unwrap_or_default())
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
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;
        let mut history = Self::read_json::<Vec<HistoryEntry>>(&self.history_path(id))
            .await?
            .unwrap_or_default();
        history.push(entry);
        Self::write_json_atomic(&self.history_path(id), &history).await?;
        Ok(())
    }

    async fn create_session(
        &self,
        name: &str,
        description: Option<&str>,
        id: Option<SessionId>,
    ) -> Result<SessionMetadata, SessionError> {
        let id = id.unwrap_or_else(SessionId::generate);
        let lock = self.lock_for(&id).await;
        let _guard = lock.lock().await;

        if tokio::fs::try_exists(self.meta_path(&id)).await? {
            return Err(SessionError::AlreadyExists(id.to_string()));
        }

        let now = Utc::now();
        let meta = SessionMetadata::new(id.clone(), name, description.map(str::to_string), now);
        Self::write_json_atomic(&self.meta_path(&id), &meta).await?;
        Self::write_json_atomic(&self.state_path(&id), &WorldState::fresh(now)).await?;
        Self::write_json_atomic(&self.history_path(&id), &Vec::<HistoryEntry>::new()).await?;
        Ok(meta)
    }

    async fn list_sessions(
        &self,
        sort: SortKey,
        limit: usize,
    ) -> Result<Vec<SessionMetadata>, SessionError> {
        let sessions_dir = self.root.join("sessions");
        let mut entries = match tokio::fs::read_dir(&sessions_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut metas = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(raw_id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(id) = SessionId::parse(raw_id) else {
                continue;
            };
            if let Some(meta) =
                Self::read_json::<SessionMetadata>(&self.meta_path(&id)).await?
            {
                metas.push(meta);
            }
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
        match Self::read_json::<SessionMetadata>(&self.meta_path(id)).await? {
            Some(meta) => Ok(meta),
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), SessionError> {
        if id.is_default() {
            return Err(SessionError::InvalidInput(
                "the default session cannot be deleted".to_string(),
            ));
        }
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let dir = self.session_dir(id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SessionError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn reset_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let now = Utc::now();
        Self::write_json_atomic(&self.state_path(id), &WorldState::fresh(now)).await?;
        Self::write_json_atomic(&self.history_path(id), &Vec::<HistoryEntry>::new()).await?;

        let mut meta = self.load_meta_or_default(id).await?;
        meta.turn_count = 0;
        meta.player_alive = true;
        meta.last_accessed = now;
        Self::write_json_atomic(&self.meta_path(id), &meta).await?;
        Ok(())
    }

    async fn save_replay_tape(&self, id: &SessionId, bytes: &[u8]) -> Result<String, SessionError> {
        let dir = self.tapes_dir(id);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.bin", uuid::Uuid::new_v4());
        let tmp_path = dir.join(format!("{name}.tmp"));
        let final_path = dir.join(&name);
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Fate;

    fn sample_entry(turn: u32) -> HistoryEntry {
        HistoryEntry {
            turn,
            choice: "Climb the ridge".to_string(),
            is_custom_action: false,
            fate: Fate::Normal,
            dispatch: "You climb.".to_string(),
            vision: "A ridge, windswept.".to_string(),
            image_path: None,
            world_prompt_snapshot: String::new(),
            hard_transition: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn implicit_creation_writes_fresh_state_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::parse("alpha").unwrap();

        let state = store.load_state(&id).await.unwrap();
        assert_eq!(state.turn_count, 0);

        assert!(tokio::fs::try_exists(dir.path().join("sessions/alpha/state.json"))
            .await
            .unwrap());
        assert!(tokio::fs::try_exists(dir.path().join("sessions/alpha/meta.json"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn explicit_create_then_collision_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::parse("alpha").unwrap();

        store.create_session("Alpha", None, Some(id.clone())).await.unwrap();
        let err = store
            .create_session("Alpha again", None, Some(id))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn save_state_round_trips_across_a_fresh_store_handle() {
        let dir = tempfile::tempdir().unwrap();
        let id = SessionId::parse("alpha").unwrap();

        {
            let store = FsSessionStore::new(dir.path());
            let mut state = store.load_state(&id).await.unwrap();
            state.turn_count = 3;
            state.world_prompt = "A different world".to_string();
            store.save_state(&id, &state).await.unwrap();
        }

        let store = FsSessionStore::new(dir.path());
        let reloaded = store.load_state(&id).await.unwrap();
        assert_eq!(reloaded.turn_count, 3);
        assert_eq!(reloaded.world_prompt, "A different world");
    }

    #[tokio::test]
    async fn no_tmp_files_survive_a_successful_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::parse("alpha").unwrap();
        let state = store.load_state(&id).await.unwrap();
        store.save_state(&id, &state).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path().join("sessions/alpha"))
            .await
            .unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            assert!(!name.ends_with(".tmp"), "leftover tmp file: {name}");
        }
    }

    #[tokio::test]
    async fn append_history_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::parse("alpha").unwrap();

        store.append_history(&id, sample_entry(1)).await.unwrap();
        store.append_history(&id, sample_entry(2)).await.unwrap();

        let history = store.load_history(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].turn, 1);
        assert_eq!(history[1].turn, 2);
    }

    #[tokio::test]
    async fn get_history_last_n_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::parse("alpha").unwrap();
        for turn in 1..=4 {
            store.append_history(&id, sample_entry(turn)).await.unwrap();
        }
        let last_two = store.get_history(&id, Some(2)).await.unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].turn, 3);
        assert_eq!(last_two[1].turn, 4);
    }

    #[tokio::test]
    async fn delete_removes_directory_then_session_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::parse("alpha").unwrap();
        store.create_session("Alpha", None, Some(id.clone())).await.unwrap();

        store.delete_session(&id).await.unwrap();

        assert!(matches!(
            store.get_session(&id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(!tokio::fs::try_exists(dir.path().join("sessions/alpha"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn default_session_cannot_be_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::default_session();
        store.load_state(&id).await.unwrap();

        let err = store.delete_session(&id).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reset_clears_history_and_state_but_keeps_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::parse("alpha").unwrap();

        store.append_history(&id, sample_entry(1)).await.unwrap();
        let mut state = store.load_state(&id).await.unwrap();
        state.turn_count = 1;
        state.player_state.alive = false;
        store.save_state(&id, &state).await.unwrap();

        store.reset_session(&id).await.unwrap();

        assert!(store.load_history(&id).await.unwrap().is_empty());
        let state = store.load_state(&id).await.unwrap();
        assert_eq!(state.turn_count, 0);
        assert!(state.player_state.alive);
        assert!(store.get_session(&id).await.is_ok());
    }

    #[tokio::test]
    async fn sessions_are_isolated_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let alpha = SessionId::parse("alpha").unwrap();
        let beta = SessionId::parse("beta").unwrap();

        store.append_history(&alpha, sample_entry(1)).await.unwrap();

        assert_eq!(store.load_history(&alpha).await.unwrap().len(), 1);
        assert!(store.load_history(&beta).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_sessions_sorts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        store
            .create_session("Zephyr", None, Some(SessionId::parse("z").unwrap()))
            .await
            .unwrap();
        store
            .create_session("Alpine", None, Some(SessionId::parse("a").unwrap()))
            .await
            .unwrap();

        let sessions = store.list_sessions(SortKey::Name, 10).await.unwrap();
        assert_eq!(sessions[0].name, "Alpine");
        assert_eq!(sessions[1].name, "Zephyr");
    }

    #[tokio::test]
    async fn save_replay_tape_writes_under_tapes_with_no_leftover_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let id = SessionId::parse("alpha").unwrap();

        let name = store.save_replay_tape(&id, b"fake replay bytes").await.unwrap();
        let path = dir.path().join("sessions/alpha/tapes").join(&name);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"fake replay bytes");

        let mut entries = tokio::fs::read_dir(dir.path().join("sessions/alpha/tapes"))
            .await
            .unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
        }
    }

    #[test]
    fn fs_session_store_implements_session_store() {
        fn assert_session_store<T: SessionStore>() {}
        assert_session_store::<FsSessionStore>();
    }
}
