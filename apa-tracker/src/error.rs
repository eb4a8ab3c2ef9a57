//! Error types for apa-tracker
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for apa-tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Submission failed before a task id was obtained
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Submit precondition not met (missing primary document, credential not acknowledged)
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// Operation not valid in the current session phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A stream for this task is already open
    #[error("Event stream already open for task {0}")]
    StreamAlreadyOpen(String),

    /// Network or channel failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP response
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Artifact or figure requested before it was marked ready
    #[error("Not ready: {0}")]
    NotReady(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// apa-common error
    #[error(transparent)]
    Common(#[from] apa_common::Error),
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Transport(err.to_string())
    }
}

/// Convenience Result type using apa-tracker error
pub type Result<T> = std::result::Result<T, TrackerError>;
