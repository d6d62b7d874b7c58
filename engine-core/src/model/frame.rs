//! Frame references — paths to generated images.

use serde::{Deserialize, Serialize};

/// Relative path, under every session's asset root, of the process-wide
/// branding frame appended to a session's Frame Buffer at intro (and
/// again on every post-Restart re-entry into the intro path). A single
/// shared asset, not per-session content — callers serve it directly
/// rather than asking any generator to produce it.
pub const BRANDING_FRAME_PATH: &str = "branding/intro.png";

/// A path to a generated image (or the process-wide branding frame).
///
/// Every `FrameRef` appended to a session's Frame Buffer refers to a file
/// inside that session's image directory or the branding asset — never to
/// another session's directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct FrameRef(String);

impl FrameRef {
    /// Wrap a path. Callers are responsible for the session-ownership
    /// invariant; this type does not itself validate the path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Borrow the underlying path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
