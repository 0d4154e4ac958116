//! Error types for Stenolink Core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),
}

/// Result type alias for Stenolink Core operations
pub type Result<T> = std::result::Result<T, Error>;
