//! Stenolink Protocol - realtime transcription feed decoding
//!
//! A streaming decoder for the STX/ETX-framed court-reporting feed
//! protocol.
//!
//! ## Frame Format
//! ```text
//! STX letter payload ETX
//! ```
//!
//! ## Commands
//! ```text
//! P <u16 le>   page            N <u8>       line
//! F <u8>       format          T <4 bytes>  timecode HH MM SS FF
//! D            delete          K            prevent saving
//! R <8 bytes>  refresh window  E            end refresh
//! ```
//!
//! Bytes outside frames are literal transcript text. Feed chunks of any
//! size to [`FeedParser::feed`] and receive ordered [`FeedItem`]s:
//! state-tagged transcript events plus one atomic [`RefreshBatch`] per
//! completed correction cycle.

pub mod command;
pub mod error;
pub mod framer;
pub mod parser;

pub use command::{decode, encode, payload_len};
pub use error::{ProtocolError, ProtocolResult};
pub use framer::{Delimiters, Framer, Unit};
pub use parser::{FeedItem, FeedParser, ParserState};

// Re-exported so protocol consumers get the event model without naming the
// core crate.
pub use stenolink_core::{FeedCommand, RefreshBatch, Timecode, TranscriptEvent};
