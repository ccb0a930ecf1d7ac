//! Error taxonomy for the synchronization runtime.

use thiserror::Error;

use crate::reducer::ReducerError;

/// Errors surfaced by synced stores and the desktop session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The realtime backend is unreachable or misconfigured. Blocks the whole UI.
    #[error("realtime backend unavailable: {0}")]
    BackendUnavailable(String),
    /// A store operation was rejected before it was sent.
    #[error("realtime transport error: {0}")]
    Transport(String),
    /// A registry operation referenced an unknown instance.
    #[error("program not found: {0}")]
    ProgramNotFound(String),
    /// An open was rejected by the window cap.
    #[error("{0}")]
    WindowLimitReached(String),
    /// A stored value could not be decoded.
    #[error("malformed value at {path}: {message}")]
    Decode {
        /// Backend path of the value.
        path: String,
        /// Decoder message.
        message: String,
    },
}

impl From<ReducerError> for SyncError {
    fn from(err: ReducerError) -> Self {
        match err {
            ReducerError::ProgramNotFound(id) => Self::ProgramNotFound(id),
        }
    }
}
