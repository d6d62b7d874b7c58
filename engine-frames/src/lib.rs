#![deny(missing_docs)]
//! Per-session ordered registry of generated frame references.
//!
//! This crate does no I/O — frame bytes are written by whatever
//! `ImageGenerator` implementation is in play, and by the Session Store.
//! The registry only tracks the ordered list of `FrameRef`s a session has
//! produced, so the Death Orchestrator can take a stable snapshot for
//! replay assembly while other sessions keep appending independently.

use std::collections::HashMap;

use engine_core::{FrameRef, SessionId};
use tokio::sync::RwLock;

/// Per-session ordered list of frame references.
pub struct FrameRegistry {
    frames: RwLock<HashMap<SessionId, Vec<FrameRef>>>,
}

impl FrameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            frames: RwLock::new(HashMap::new()),
        }
    }

    /// Append one frame reference to a session's list, creating the list
    /// if this is the session's first frame.
    pub async fn append(&self, id: &SessionId, frame: FrameRef) {
        let mut frames = self.frames.write().await;
        frames.entry(id.clone()).or_default().push(frame);
    }

    /// Take a stable, cloned snapshot of a session's frame list so far.
    pub async fn snapshot(&self, id: &SessionId) -> Vec<FrameRef> {
        self.frames
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Count of frames recorded for a session, without cloning the list.
    pub async fn count(&self, id: &SessionId) -> usize {
        self.frames.read().await.get(id).map_or(0, Vec::len)
    }

    /// Clear a session's frame list, e.g. on Restart.
    pub async fn clear(&self, id: &SessionId) {
        self.frames.write().await.remove(id);
    }
}

impl Default for FrameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SessionId {
        SessionId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn append_then_snapshot_preserves_order() {
        let registry = FrameRegistry::new();
        let session = id("alpha");
        registry.append(&session, FrameRef::new("frame-1")).await;
        registry.append(&session, FrameRef::new("frame-2")).await;

        let snapshot = registry.snapshot(&session).await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].as_str(), "frame-1");
        assert_eq!(snapshot[1].as_str(), "frame-2");
    }

    #[tokio::test]
    async fn snapshot_of_unknown_session_is_empty() {
        let registry = FrameRegistry::new();
        let snapshot = registry.snapshot(&id("never-seen")).await;
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn sessions_do_not_share_frame_lists() {
        let registry = FrameRegistry::new();
        registry.append(&id("alpha"), FrameRef::new("a1")).await;
        registry.append(&id("beta"), FrameRef::new("b1")).await;

        assert_eq!(registry.count(&id("alpha")).await, 1);
        assert_eq!(registry.count(&id("beta")).await, 1);
        assert_eq!(registry.snapshot(&id("alpha")).await[0].as_str(), "a1");
    }

    #[tokio::test]
    async fn clear_removes_the_session_entirely() {
        let registry = FrameRegistry::new();
        let session = id("alpha");
        registry.append(&session, FrameRef::new("frame-1")).await;
        registry.clear(&session).await;

        assert_eq!(registry.count(&session).await, 0);
        assert!(registry.snapshot(&session).await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_a_stable_copy_not_a_live_view() {
        let registry = FrameRegistry::new();
        let session = id("alpha");
        registry.append(&session, FrameRef::new("frame-1")).await;
        let snapshot = registry.snapshot(&session).await;

        registry.append(&session, FrameRef::new("frame-2")).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.count(&session).await, 2);
    }
}
