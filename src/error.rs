//! Typed errors for the storage and identity seams.
//!
//! Application and CLI code wraps these in `anyhow` like everything else.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize collection: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not find {0} directory")]
    NoDirectory(&'static str),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not signed in. Run `ideacanvas login` first.")]
    NotSignedIn,
    #[error("{0}")]
    NotConfigured(String),
    #[error("sign-in failed: {0}")]
    Provider(String),
    #[error("CSRF token mismatch - possible security issue")]
    CsrfMismatch,
    #[error("callback server error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
