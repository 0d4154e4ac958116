//! Feed parser state machine
//!
//! Applies decoded commands to the per-connection parser state, tags every
//! emitted character and command with a snapshot of that state, and owns
//! refresh-mode entry and exit.

use crate::command;
use crate::framer::{Delimiters, Framer, Unit};
use stenolink_core::{FeedCommand, RefreshBatch, Timecode, TranscriptEvent};
use tracing::{debug, warn};

/// Mutable decode state for one feed connection.
///
/// Exactly one instance exists per connection. Emitted events receive
/// copies of these fields, never references, so later mutation can never
/// retroactively change an already-emitted event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParserState {
    pub page: u16,
    pub line: u8,
    pub format: u8,
    pub timecode: Option<Timecode>,
    pub in_refresh: bool,
    pub refresh_window: Option<(Timecode, Timecode)>,
}

/// Output of one `feed` call, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    Event(TranscriptEvent),
    Refresh(RefreshBatch),
}

/// Streaming feed parser: framer, state machine, and refresh buffering.
pub struct FeedParser {
    framer: Framer,
    state: ParserState,
    refresh_buffer: Vec<TranscriptEvent>,
}

impl FeedParser {
    pub fn new() -> Self {
        Self::with_delimiters(Delimiters::Control)
    }

    pub fn with_delimiters(delimiters: Delimiters) -> Self {
        Self {
            framer: Framer::with_delimiters(delimiters),
            state: ParserState::default(),
            refresh_buffer: Vec::new(),
        }
    }

    /// Current decode state (live, not a snapshot).
    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Bytes held in the carry-over buffer (an in-flight partial frame).
    pub fn pending_bytes(&self) -> usize {
        self.framer.pending()
    }

    /// Events buffered for the current refresh cycle.
    pub fn pending_refresh_events(&self) -> usize {
        self.refresh_buffer.len()
    }

    /// Feed one chunk of bytes, in arrival order.
    ///
    /// Chunk boundaries are arbitrary: a frame may span chunks and several
    /// frames may arrive in one chunk, with no effect on the emitted event
    /// sequence. Decode errors are never fatal; malformed frames are
    /// skipped at their nominal length and unknown letters resynchronize
    /// one byte later.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<FeedItem> {
        self.framer.feed(chunk);

        let mut out = Vec::new();
        while let Some(unit) = self.framer.next_unit() {
            match unit {
                Unit::Text(bytes) => {
                    for &byte in &bytes {
                        self.emit_text(byte, &mut out);
                    }
                }
                Unit::Frame { letter, payload } => match command::decode(letter, &payload) {
                    Ok(cmd) => self.apply(cmd, &mut out),
                    Err(e) => warn!(error = %e, "Dropping undecodable frame"),
                },
                Unit::Malformed { letter } => {
                    warn!(
                        letter = %(letter as char),
                        "Malformed frame: wrong end delimiter, side effects dropped"
                    );
                }
                Unit::Unknown { letter } => {
                    warn!(letter, "Unknown command letter, resynchronizing");
                }
            }
        }
        out
    }

    fn emit_text(&mut self, byte: u8, out: &mut Vec<FeedItem>) {
        // Printable plus CR/LF/TAB; everything else is dropped silently.
        if byte < 0x20 && byte != b'\r' && byte != b'\n' && byte != b'\t' {
            return;
        }
        let event = TranscriptEvent::Text {
            ch: byte as char,
            page: self.state.page,
            line: self.state.line,
            format: self.state.format,
            timecode: self.state.timecode,
        };
        self.push_event(event, out);
    }

    fn apply(&mut self, cmd: FeedCommand, out: &mut Vec<FeedItem>) {
        match cmd {
            FeedCommand::Page(n) => {
                self.state.page = n;
                self.emit_command(cmd, out);
            }
            FeedCommand::Line(n) => {
                self.state.line = n;
                self.emit_command(cmd, out);
            }
            FeedCommand::Format(f) => {
                self.state.format = f;
                self.emit_command(cmd, out);
            }
            FeedCommand::Timecode(tc) => {
                self.state.timecode = Some(tc);
                self.emit_command(cmd, out);
            }
            FeedCommand::Delete | FeedCommand::PreventSave => {
                // No state mutation; forwarded for consumer bookkeeping.
                self.emit_command(cmd, out);
            }
            FeedCommand::RefreshStart { start, end } => {
                self.state.in_refresh = true;
                self.state.refresh_window = Some((start, end));
                self.refresh_buffer.clear();
            }
            FeedCommand::RefreshEnd => {
                if !self.state.in_refresh {
                    debug!("RefreshEnd outside refresh mode, ignored");
                    return;
                }
                self.state.in_refresh = false;
                if let Some((start, end)) = self.state.refresh_window.take() {
                    out.push(FeedItem::Refresh(RefreshBatch {
                        window_start: start,
                        window_end: end,
                        events: std::mem::take(&mut self.refresh_buffer),
                    }));
                }
            }
        }
    }

    fn emit_command(&mut self, command: FeedCommand, out: &mut Vec<FeedItem>) {
        let event = TranscriptEvent::Command {
            command,
            page: self.state.page,
            line: self.state.line,
        };
        self.push_event(event, out);
    }

    fn push_event(&mut self, event: TranscriptEvent, out: &mut Vec<FeedItem>) {
        // During refresh the event is appended to the replacement buffer and
        // still emitted live: the correction is displayed once finalized,
        // not hidden mid-stream.
        if self.state.in_refresh {
            self.refresh_buffer.push(event.clone());
        }
        out.push(FeedItem::Event(event));
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}
