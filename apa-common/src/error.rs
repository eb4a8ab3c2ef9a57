//! Common error types for APA

use thiserror::Error;

/// Common result type for APA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across APA components
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stream frame that could not be decoded into a pipeline event
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedFrame(err.to_string())
    }
}
