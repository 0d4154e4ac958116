//! Protocol error types

use thiserror::Error;

/// Protocol-specific errors
///
/// No error here is fatal to a connection: the policy is always to skip the
/// smallest possible unit and keep decoding, because the feed is a live,
/// unrecoverable stream.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The frame's payload has not fully arrived; wait for more bytes.
    #[error("Incomplete frame for '{letter}': have {have} of {need} payload bytes")]
    Incomplete { letter: char, have: usize, need: usize },

    /// A known-letter frame did not close with the expected end delimiter.
    #[error("Malformed frame for '{letter}': wrong end delimiter")]
    Malformed { letter: char },

    /// Unrecognized command letter.
    #[error("Unknown command letter: 0x{letter:02X}")]
    UnknownCommand { letter: u8 },
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
