//! Paragraph reconstruction from transcript events
//!
//! A Format command is the authoritative paragraph break. Line commands
//! insert a break marker without flushing, CR/LF bytes in literal text fold
//! to a single space, and Delete backspaces one character from the running
//! buffer.

use crate::event::{FeedCommand, TranscriptEvent};
use crate::timecode::Timecode;
use serde::{Deserialize, Serialize};

/// A finalized run of text bounded by Format-change commands.
///
/// Tagged with the page/line/format/timecode in effect when the run ended,
/// i.e. before the Format value that flushed it took hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    pub format: u8,
    pub page: u16,
    pub line: u8,
    pub timecode: Option<Timecode>,
}

/// Accumulates transcript events into finalized paragraphs.
#[derive(Debug, Default)]
pub struct ParagraphBuilder {
    buf: String,
    page: u16,
    line: u8,
    format: u8,
    timecode: Option<Timecode>,
    out: Vec<Paragraph>,
}

impl ParagraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event, in transcript order.
    pub fn push(&mut self, event: &TranscriptEvent) {
        match event {
            TranscriptEvent::Text {
                ch,
                page,
                line,
                format,
                timecode,
            } => {
                self.page = *page;
                self.line = *line;
                self.format = *format;
                self.timecode = *timecode;
                if *ch == '\r' || *ch == '\n' {
                    // Raw CR/LF never break paragraphs; fold runs to one space.
                    if !self.buf.is_empty() && !self.buf.ends_with([' ', '\n']) {
                        self.buf.push(' ');
                    }
                } else {
                    self.buf.push(*ch);
                }
            }
            TranscriptEvent::Command {
                command,
                page,
                line,
            } => match command {
                FeedCommand::Format(f) => {
                    self.flush();
                    self.page = *page;
                    self.line = *line;
                    self.format = *f;
                }
                FeedCommand::Line(n) => {
                    self.line = *n;
                    if !self.buf.is_empty() {
                        self.buf.push('\n');
                    }
                }
                FeedCommand::Page(p) => self.page = *p,
                FeedCommand::Timecode(tc) => self.timecode = Some(*tc),
                FeedCommand::Delete => {
                    self.buf.pop();
                }
                _ => {}
            },
        }
    }

    fn flush(&mut self) {
        let text = self.buf.trim();
        if !text.is_empty() {
            self.out.push(Paragraph {
                text: text.to_string(),
                format: self.format,
                page: self.page,
                line: self.line,
                timecode: self.timecode,
            });
        }
        self.buf.clear();
    }

    /// Flush any trailing text and return the finalized paragraphs.
    pub fn finish(mut self) -> Vec<Paragraph> {
        self.flush();
        self.out
    }
}

/// Reconstruct paragraphs from an ordered event slice.
pub fn paragraphs(events: &[TranscriptEvent]) -> Vec<Paragraph> {
    let mut builder = ParagraphBuilder::new();
    for event in events {
        builder.push(event);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(ch: char, format: u8) -> TranscriptEvent {
        TranscriptEvent::Text {
            ch,
            page: 1,
            line: 1,
            format,
            timecode: None,
        }
    }

    fn command(command: FeedCommand) -> TranscriptEvent {
        TranscriptEvent::Command {
            command,
            page: 1,
            line: 1,
        }
    }

    fn push_str(events: &mut Vec<TranscriptEvent>, s: &str, format: u8) {
        for ch in s.chars() {
            events.push(text(ch, format));
        }
    }

    #[test]
    fn test_format_flushes_paragraphs() {
        let mut events = vec![command(FeedCommand::Format(1))];
        push_str(&mut events, "Q. Hi", 1);
        events.push(command(FeedCommand::Format(2)));
        push_str(&mut events, "A. Hello", 2);

        let paras = paragraphs(&events);
        assert_eq!(paras.len(), 2);
        assert_eq!(paras[0].text, "Q. Hi");
        assert_eq!(paras[0].format, 1);
        assert_eq!(paras[1].text, "A. Hello");
        assert_eq!(paras[1].format, 2);
    }

    #[test]
    fn test_empty_buffer_produces_no_paragraph() {
        let events = vec![
            command(FeedCommand::Format(1)),
            command(FeedCommand::Format(2)),
            command(FeedCommand::Format(3)),
        ];
        assert!(paragraphs(&events).is_empty());
    }

    #[test]
    fn test_crlf_folds_to_single_space() {
        let mut events = Vec::new();
        push_str(&mut events, "one", 1);
        events.push(text('\r', 1));
        events.push(text('\n', 1));
        push_str(&mut events, "two", 1);

        let paras = paragraphs(&events);
        assert_eq!(paras.len(), 1);
        assert_eq!(paras[0].text, "one two");
    }

    #[test]
    fn test_line_inserts_break_without_flushing() {
        let mut events = Vec::new();
        push_str(&mut events, "first", 5);
        events.push(command(FeedCommand::Line(2)));
        push_str(&mut events, "second", 5);

        let paras = paragraphs(&events);
        assert_eq!(paras.len(), 1);
        assert_eq!(paras[0].text, "first\nsecond");
    }

    #[test]
    fn test_line_on_empty_buffer_is_noop() {
        let mut events = vec![command(FeedCommand::Line(2))];
        push_str(&mut events, "text", 1);

        let paras = paragraphs(&events);
        assert_eq!(paras[0].text, "text");
    }

    #[test]
    fn test_delete_backspaces() {
        let mut events = Vec::new();
        push_str(&mut events, "worx", 1);
        events.push(command(FeedCommand::Delete));
        push_str(&mut events, "d", 1);

        let paras = paragraphs(&events);
        assert_eq!(paras[0].text, "word");
    }

    #[test]
    fn test_paragraph_tagged_with_state_before_new_format() {
        let tc = Timecode::new(9, 30, 0, 0);
        let mut events = vec![
            command(FeedCommand::Page(7)),
            command(FeedCommand::Line(3)),
            command(FeedCommand::Format(1)),
            command(FeedCommand::Timecode(tc)),
        ];
        for ch in "testimony".chars() {
            events.push(TranscriptEvent::Text {
                ch,
                page: 7,
                line: 3,
                format: 1,
                timecode: Some(tc),
            });
        }
        events.push(command(FeedCommand::Format(2)));

        let paras = paragraphs(&events);
        assert_eq!(paras.len(), 1);
        assert_eq!(paras[0].format, 1);
        assert_eq!(paras[0].page, 7);
        assert_eq!(paras[0].line, 3);
        assert_eq!(paras[0].timecode, Some(tc));
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let mut events = Vec::new();
        push_str(&mut events, "  spaced  ", 1);
        events.push(command(FeedCommand::Format(2)));

        let paras = paragraphs(&events);
        assert_eq!(paras[0].text, "spaced");
    }
}
