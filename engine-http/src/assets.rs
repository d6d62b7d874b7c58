//! Static serving for a session's generated frames, replay tapes, and
//! stitched video outputs.
//!
//! Every filename is validated against `^[A-Za-z0-9._-]+$` and rejected
//! if it is `.`/`..` or contains a `..` traversal segment, before any
//! path is ever joined and touched on disk — the same "validate before
//! you build the path" discipline `engine_core::SessionId::parse`
//! applies to session identifiers.

use std::path::PathBuf;
use std::sync::OnceLock;

use axum::extract::{Path as AxumPath, State};
use axum::response::IntoResponse;

use engine::engine_core::SessionId;

use crate::error::ApiError;
use crate::AppState;

/// Which of the three asset kinds §6 serves statically, and the
/// directory each lives under relative to a session's root.
#[derive(Debug, Clone, Copy)]
pub enum AssetKind {
    /// `sessions/<id>/images/<file>`.
    Image,
    /// `sessions/<id>/tapes/<file>`.
    Tape,
    /// `sessions/<id>/films/final/<file>`.
    Video,
}

impl AssetKind {
    fn subdir(self) -> &'static str {
        match self {
            AssetKind::Image => "images",
            AssetKind::Tape => "tapes",
            AssetKind::Video => "films/final",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            AssetKind::Image => "image/png",
            AssetKind::Tape => "image/gif",
            AssetKind::Video => "video/mp4",
        }
    }
}

fn filename_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex"))
}

fn validate_filename(name: &str) -> Result<(), ApiError> {
    if !filename_pattern().is_match(name) {
        return Err(ApiError::BadRequest(format!(
            "filename {name:?} does not match ^[A-Za-z0-9._-]+$"
        )));
    }
    if name == "." || name == ".." || name.contains("..") {
        return Err(ApiError::BadRequest(format!(
            "filename {name:?} is not a valid asset name"
        )));
    }
    Ok(())
}

/// Serve one session asset file, after validating both the session id
/// and the filename.
pub async fn serve_asset(
    State(state): State<AppState>,
    AxumPath((id, file)): AxumPath<(String, String)>,
    kind: AssetKind,
) -> Result<impl IntoResponse, ApiError> {
    let session = SessionId::parse(id)?;
    validate_filename(&file)?;

    let path: PathBuf = state
        .assets_root
        .join("sessions")
        .join(session.as_str())
        .join(kind.subdir())
        .join(&file);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("asset {file:?} not found for session {session}")))?;

    Ok(([(axum::http::header::CONTENT_TYPE, kind.content_type())], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_filenames() {
        assert!(validate_filename("frame-1.png").is_ok());
        assert!(validate_filename("replay_01.gif").is_ok());
    }

    #[test]
    fn rejects_traversal_and_bare_dots() {
        for bad in ["..", ".", "../x", "a/b.png", "a\\b.png"] {
            assert!(validate_filename(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }
}
