//! Transcript events and refresh batches

use crate::timecode::Timecode;
use serde::{Deserialize, Serialize};

/// A decoded feed command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedCommand {
    /// P — set the current page (little-endian u16 on the wire)
    Page(u16),

    /// N — set the current line
    Line(u8),

    /// F — set the current format; the authoritative paragraph break
    Format(u8),

    /// T — set the current timecode tag
    Timecode(Timecode),

    /// D — backspace one character (consumer bookkeeping)
    Delete,

    /// K — mark the session as not-to-be-saved (consumer bookkeeping)
    PreventSave,

    /// R — enter refresh mode for the given timecode window
    RefreshStart { start: Timecode, end: Timecode },

    /// E — leave refresh mode and finalize the replacement batch
    RefreshEnd,
}

impl FeedCommand {
    /// The single ASCII byte identifying this command on the wire.
    pub fn letter(&self) -> u8 {
        match self {
            FeedCommand::Page(_) => b'P',
            FeedCommand::Line(_) => b'N',
            FeedCommand::Format(_) => b'F',
            FeedCommand::Timecode(_) => b'T',
            FeedCommand::Delete => b'D',
            FeedCommand::PreventSave => b'K',
            FeedCommand::RefreshStart { .. } => b'R',
            FeedCommand::RefreshEnd => b'E',
        }
    }
}

/// An event emitted by the parser state machine.
///
/// Every event carries a snapshot of the parser state as of emission, never
/// a reference to the live state: later mutation of the parser must not
/// retroactively change already-emitted events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// One character of literal transcript text
    Text {
        ch: char,
        page: u16,
        line: u8,
        format: u8,
        timecode: Option<Timecode>,
    },

    /// A decoded command forwarded downstream
    Command {
        command: FeedCommand,
        page: u16,
        line: u8,
    },
}

impl TranscriptEvent {
    /// The timecode tag, if this event carries one.
    pub fn timecode(&self) -> Option<Timecode> {
        match self {
            TranscriptEvent::Text { timecode, .. } => *timecode,
            TranscriptEvent::Command { .. } => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, TranscriptEvent::Text { .. })
    }
}

/// One refresh cycle's replacement content plus its timecode window.
///
/// Materialized exactly once per refresh cycle and applied to the
/// transcript as a single atomic splice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshBatch {
    pub window_start: Timecode,
    pub window_end: Timecode,
    pub events: Vec<TranscriptEvent>,
}
