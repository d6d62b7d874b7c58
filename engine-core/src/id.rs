//! Typed session identifier with binding validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::SessionError;

/// The reserved session id. May be created implicitly and reset, never deleted.
pub const DEFAULT_SESSION_ID: &str = "default";

fn id_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^[A-Za-z0-9_-]{1,100}$").expect("valid regex"))
}

/// A validated session identifier.
///
/// The only way to construct one is [`SessionId::parse`] (or
/// [`SessionId::generate`]), so a `SessionId` in hand is always known to
/// match `^[A-Za-z0-9_-]{1,100}$` — callers never need to re-validate it.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a raw identifier.
    ///
    /// Rejects the empty string, `.`/`..`, path separators, and any
    /// character outside `[A-Za-z0-9_-]`, per the binding session id
    /// validation rule.
    pub fn parse(raw: impl Into<String>) -> Result<Self, SessionError> {
        let raw = raw.into();
        if id_pattern().is_match(&raw) {
            Ok(Self(raw))
        } else {
            Err(SessionError::InvalidInput(format!(
                "session id {raw:?} does not match ^[A-Za-z0-9_-]{{1,100}}$"
            )))
        }
    }

    /// Generate a fresh v4-UUID-backed session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The reserved `default` session id.
    pub fn default_session() -> Self {
        Self(DEFAULT_SESSION_ID.to_string())
    }

    /// Whether this is the reserved `default` session id.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_SESSION_ID
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_ids() {
        assert!(SessionId::parse("alpha").is_ok());
        assert!(SessionId::parse("alpha-1_2").is_ok());
        assert!(SessionId::parse("default").is_ok());
    }

    #[test]
    fn rejects_boundary_cases() {
        for bad in ["", ".", "..", "a/b", "a b", "../etc"] {
            assert!(SessionId::parse(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn rejects_over_length() {
        let too_long = "a".repeat(101);
        assert!(SessionId::parse(too_long).is_err());
    }

    #[test]
    fn default_session_is_recognized() {
        let id = SessionId::default_session();
        assert!(id.is_default());
        assert_eq!(id.as_str(), "default");
    }

    #[test]
    fn generate_produces_parseable_id() {
        let id = SessionId::generate();
        assert!(SessionId::parse(id.as_str()).is_ok());
    }
}
