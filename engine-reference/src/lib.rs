#![deny(missing_docs)]
//! Selects which prior frame(s) to pass to the image generator for
//! visual continuity.
//!
//! Pure function, no I/O, no locks: the Turn Pipeline feeds it whatever
//! history it already holds under the session lock.

use engine_core::{FrameRef, HistoryEntry};

/// Walks `history` in reverse, collecting image-bearing entries until
/// either `n` frames have been collected, or an entry marked
/// `hard_transition = true` is reached — that entry is included, and
/// collection stops there. No frame from before a hard transition is
/// ever returned alongside frames from after it.
///
/// Returned oldest-first.
pub fn select_references(history: &[HistoryEntry], n: usize) -> Vec<FrameRef> {
    if n == 0 {
        return Vec::new();
    }

    let mut collected = Vec::with_capacity(n);
    for entry in history.iter().rev() {
        let Some(image_path) = entry.image_path.as_ref() else {
            continue;
        };
        collected.push(FrameRef::new(image_path.clone()));

        if entry.hard_transition || collected.len() >= n {
            break;
        }
    }

    collected.reverse();
    collected
}
