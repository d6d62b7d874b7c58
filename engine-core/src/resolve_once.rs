//! The exactly-once compare-and-set primitive shared by the Countdown
//! Coordinator (`PlayerInput` vs `Deadline`) and the Death/Restart
//! Orchestrator (manual click vs auto-deadline). Both are structurally the
//! same problem — exactly one of two competing resolutions wins — so they
//! share this primitive while keeping their own outcome types distinct.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A single-resolution gate: the first caller to call [`try_resolve`] wins
/// and gets `Some(value)` back; every subsequent caller gets `None`,
/// regardless of how close the race was.
///
/// [`try_resolve`]: ResolveOnce::try_resolve
pub struct ResolveOnce<T> {
    resolved: AtomicBool,
    winner: Mutex<Option<T>>,
}

impl<T: Clone> ResolveOnce<T> {
    /// An unresolved gate.
    pub fn new() -> Self {
        Self {
            resolved: AtomicBool::new(false),
            winner: Mutex::new(None),
        }
    }

    /// Attempt to resolve with `value`. Returns `Some(value)` if this call
    /// won the race, `None` if the gate was already resolved by a
    /// concurrent caller.
    pub fn try_resolve(&self, value: T) -> Option<T> {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.winner.lock().expect("resolve_once mutex poisoned") = Some(value.clone());
            Some(value)
        } else {
            None
        }
    }

    /// Whether the gate has been resolved by anyone yet.
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    /// The winning value, if resolution has happened.
    pub fn winner(&self) -> Option<T> {
        self.winner.lock().expect("resolve_once mutex poisoned").clone()
    }
}

impl<T: Clone> Default for ResolveOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}
