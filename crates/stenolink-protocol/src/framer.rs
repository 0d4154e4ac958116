//! Frame tokenizer
//!
//! Splits an arbitrarily chunked byte stream into literal text runs and
//! complete command frames. Bytes that cannot be resolved yet (a partial
//! frame, a trailing escape) stay in the carry-over buffer until more data
//! arrives; pulling units never blocks.

use crate::command::payload_len;
use bytes::BytesMut;

/// Primary frame start delimiter (STX)
pub const STX: u8 = 0x02;

/// Primary frame end delimiter (ETX)
pub const ETX: u8 = 0x03;

/// Alternate printable start delimiter, used by transports that cannot
/// carry the control bytes verbatim
pub const ALT_STX: u8 = b'{';

/// Alternate printable end delimiter
pub const ALT_ETX: u8 = b'}';

/// Escape byte introducing the two-byte encoded delimiter forms (`\{` and
/// `\}`) that appear as cosmetic timecode display annotations inside
/// literal text
pub const MARKER_ESCAPE: u8 = b'\\';

/// Which delimiter convention a feed uses.
///
/// A feed is configured with exactly one convention; mixing conventions
/// within one stream is not handled losslessly (known limitation, and under
/// the bracket convention a literal unescaped `{` cannot appear in text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiters {
    /// STX/ETX (0x02/0x03), the primary convention
    #[default]
    Control,
    /// `{`/`}` (0x7B/0x7D), the historical printable workaround
    Bracket,
}

impl Delimiters {
    pub fn start(self) -> u8 {
        match self {
            Delimiters::Control => STX,
            Delimiters::Bracket => ALT_STX,
        }
    }

    pub fn end(self) -> u8 {
        match self {
            Delimiters::Control => ETX,
            Delimiters::Bracket => ALT_ETX,
        }
    }
}

impl std::str::FromStr for Delimiters {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "control" => Ok(Delimiters::Control),
            "bracket" => Ok(Delimiters::Bracket),
            other => Err(format!("Unknown delimiter convention: {}", other)),
        }
    }
}

/// One tokenized unit of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// A run of literal text bytes, display markers already stripped
    Text(Vec<u8>),

    /// A complete frame with a matching end delimiter
    Frame { letter: u8, payload: Vec<u8> },

    /// A known-letter frame whose end delimiter did not match; its nominal
    /// length has been consumed and its side effects must be dropped
    Malformed { letter: u8 },

    /// An unknown command letter; only the start delimiter was consumed and
    /// decoding resumes at the letter byte (resynchronization)
    Unknown { letter: u8 },
}

/// Streaming frame tokenizer with a carry-over buffer.
pub struct Framer {
    buffer: BytesMut,
    delimiters: Delimiters,
}

impl Framer {
    pub fn new() -> Self {
        Self::with_delimiters(Delimiters::Control)
    }

    pub fn with_delimiters(delimiters: Delimiters) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            delimiters,
        }
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    /// Carried-over bytes not yet resolved into a unit.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Add a chunk to the carry-over buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pull the next fully resolvable unit, or `None` to wait for more data.
    pub fn next_unit(&mut self) -> Option<Unit> {
        loop {
            if self.buffer.is_empty() {
                return None;
            }

            if self.buffer[0] != self.delimiters.start() {
                let text = self.take_text()?;
                if text.is_empty() {
                    // The run was nothing but display markers.
                    continue;
                }
                return Some(Unit::Text(text));
            }

            // Inside a frame: the length is resolvable once the letter has
            // arrived.
            if self.buffer.len() < 2 {
                return None;
            }
            let letter = self.buffer[1];

            let Some(len) = payload_len(letter) else {
                // Unknown letter: consume the start delimiter only and retry
                // from the next byte.
                let _ = self.buffer.split_to(1);
                return Some(Unit::Unknown { letter });
            };

            let total = 2 + len + 1;
            if self.buffer.len() < total {
                return None;
            }

            let frame = self.buffer.split_to(total);
            if frame[total - 1] == self.delimiters.end() {
                return Some(Unit::Frame {
                    letter,
                    payload: frame[2..total - 1].to_vec(),
                });
            }
            return Some(Unit::Malformed { letter });
        }
    }

    /// Consume the literal-text run at the head of the buffer, stripping
    /// `\{`/`\}` display-marker pairs. Returns `None` when the head is a
    /// lone trailing escape that must wait for the next chunk.
    fn take_text(&mut self) -> Option<Vec<u8>> {
        let start_delim = self.delimiters.start();
        let mut out = Vec::new();
        let mut i = 0;

        while i < self.buffer.len() {
            let b = self.buffer[i];
            if b == start_delim {
                break;
            }
            if b == MARKER_ESCAPE {
                match self.buffer.get(i + 1) {
                    Some(&next) if next == ALT_STX || next == ALT_ETX => {
                        // Cosmetic display marker, not framing: drop the pair.
                        i += 2;
                    }
                    Some(_) => {
                        out.push(b);
                        i += 1;
                    }
                    // Escape at the end of the buffer: its meaning depends
                    // on the next byte, hold it back.
                    None => break,
                }
            } else {
                out.push(b);
                i += 1;
            }
        }

        if i == 0 {
            return None;
        }
        let _ = self.buffer.split_to(i);
        Some(out)
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(framer: &mut Framer) -> Vec<Unit> {
        let mut units = Vec::new();
        while let Some(unit) = framer.next_unit() {
            units.push(unit);
        }
        units
    }

    #[test]
    fn test_text_emitted_immediately() {
        let mut framer = Framer::new();
        framer.feed(b"hello");
        assert_eq!(drain(&mut framer), vec![Unit::Text(b"hello".to_vec())]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_complete_frame() {
        let mut framer = Framer::new();
        framer.feed(&[0x02, b'N', 0x07, 0x03]);
        assert_eq!(
            drain(&mut framer),
            vec![Unit::Frame {
                letter: b'N',
                payload: vec![0x07]
            }]
        );
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut framer = Framer::new();
        framer.feed(&[0x02, b'T']);
        assert_eq!(framer.next_unit(), None);
        framer.feed(&[17, 5]);
        assert_eq!(framer.next_unit(), None);
        framer.feed(&[13, 5, 0x03]);
        assert_eq!(
            drain(&mut framer),
            vec![Unit::Frame {
                letter: b'T',
                payload: vec![17, 5, 13, 5]
            }]
        );
    }

    #[test]
    fn test_text_and_frames_interleaved_in_one_chunk() {
        let mut framer = Framer::new();
        framer.feed(b"ab\x02F\x01\x03cd");
        assert_eq!(
            drain(&mut framer),
            vec![
                Unit::Text(b"ab".to_vec()),
                Unit::Frame {
                    letter: b'F',
                    payload: vec![0x01]
                },
                Unit::Text(b"cd".to_vec()),
            ]
        );
    }

    #[test]
    fn test_malformed_frame_consumes_nominal_length() {
        let mut framer = Framer::new();
        // 02 46 01 FF: wrong terminator for F.
        framer.feed(&[0x02, b'F', 0x01, 0xFF, b'o', b'k']);
        assert_eq!(
            drain(&mut framer),
            vec![Unit::Malformed { letter: b'F' }, Unit::Text(b"ok".to_vec())]
        );
    }

    #[test]
    fn test_unknown_letter_consumes_one_byte() {
        let mut framer = Framer::new();
        // 02 5A 03: Z is unknown; only STX is consumed, Z re-enters as text
        // and the stray ETX stays literal.
        framer.feed(&[0x02, 0x5A, 0x03]);
        assert_eq!(
            drain(&mut framer),
            vec![
                Unit::Unknown { letter: 0x5A },
                Unit::Text(vec![0x5A, 0x03]),
            ]
        );
    }

    #[test]
    fn test_bracket_convention() {
        let mut framer = Framer::with_delimiters(Delimiters::Bracket);
        framer.feed(b"{N\x07}text");
        assert_eq!(
            drain(&mut framer),
            vec![
                Unit::Frame {
                    letter: b'N',
                    payload: vec![0x07]
                },
                Unit::Text(b"text".to_vec()),
            ]
        );
    }

    #[test]
    fn test_bracket_frame_must_end_with_bracket() {
        let mut framer = Framer::with_delimiters(Delimiters::Bracket);
        framer.feed(&[b'{', b'F', 0x01, 0x03]);
        assert_eq!(drain(&mut framer), vec![Unit::Malformed { letter: b'F' }]);
    }

    #[test]
    fn test_display_markers_stripped_from_text() {
        let mut framer = Framer::new();
        framer.feed(b"see \\{10:04\\} marker");
        assert_eq!(
            drain(&mut framer),
            vec![Unit::Text(b"see 10:04 marker".to_vec())]
        );
    }

    #[test]
    fn test_marker_pair_split_across_chunks() {
        let mut framer = Framer::new();
        framer.feed(b"ab\\");
        assert_eq!(drain(&mut framer), vec![Unit::Text(b"ab".to_vec())]);
        framer.feed(b"{cd");
        assert_eq!(drain(&mut framer), vec![Unit::Text(b"cd".to_vec())]);
    }

    #[test]
    fn test_plain_backslash_preserved() {
        let mut framer = Framer::new();
        framer.feed(b"a\\b");
        assert_eq!(drain(&mut framer), vec![Unit::Text(b"a\\b".to_vec())]);
    }

    #[test]
    fn test_marker_only_text_yields_no_unit() {
        let mut framer = Framer::new();
        framer.feed(b"\\{\\}\x02D\x03");
        assert_eq!(
            drain(&mut framer),
            vec![Unit::Frame {
                letter: b'D',
                payload: vec![]
            }]
        );
    }
}
