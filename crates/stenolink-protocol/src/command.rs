//! Feed command wire codec
//!
//! On-wire layout per command: `STX letter payload ETX`. Payload lengths
//! are fixed: P=2 (little-endian page), N=1, F=1, T=4, D=0, K=0, R=8 (two
//! packed timecodes), E=0.

use crate::error::{ProtocolError, ProtocolResult};
use crate::framer::Delimiters;
use stenolink_core::{FeedCommand, Timecode};

/// Fixed payload length for a command letter; `None` for unknown letters.
pub fn payload_len(letter: u8) -> Option<usize> {
    match letter {
        b'P' => Some(2),
        b'N' => Some(1),
        b'F' => Some(1),
        b'T' => Some(4),
        b'D' => Some(0),
        b'K' => Some(0),
        b'R' => Some(8),
        b'E' => Some(0),
        _ => None,
    }
}

/// Decode a command from its letter and payload bytes.
///
/// Pure and positional. Timecode fields are accepted as given, even when
/// semantically out of range: the feed is authoritative.
pub fn decode(letter: u8, payload: &[u8]) -> ProtocolResult<FeedCommand> {
    let need = payload_len(letter).ok_or(ProtocolError::UnknownCommand { letter })?;
    if payload.len() < need {
        return Err(ProtocolError::Incomplete {
            letter: letter as char,
            have: payload.len(),
            need,
        });
    }

    let command = match letter {
        b'P' => FeedCommand::Page(u16::from_le_bytes([payload[0], payload[1]])),
        b'N' => FeedCommand::Line(payload[0]),
        b'F' => FeedCommand::Format(payload[0]),
        b'T' => FeedCommand::Timecode(read_timecode(&payload[..4])),
        b'D' => FeedCommand::Delete,
        b'K' => FeedCommand::PreventSave,
        b'R' => FeedCommand::RefreshStart {
            start: read_timecode(&payload[..4]),
            end: read_timecode(&payload[4..8]),
        },
        b'E' => FeedCommand::RefreshEnd,
        _ => return Err(ProtocolError::UnknownCommand { letter }),
    };
    Ok(command)
}

fn read_timecode(b: &[u8]) -> Timecode {
    Timecode::from_bytes([b[0], b[1], b[2], b[3]])
}

/// Encode a command as a complete frame under the given delimiter
/// convention.
pub fn encode(command: &FeedCommand, delimiters: Delimiters) -> Vec<u8> {
    let mut out = vec![delimiters.start(), command.letter()];
    match command {
        FeedCommand::Page(n) => out.extend_from_slice(&n.to_le_bytes()),
        FeedCommand::Line(n) => out.push(*n),
        FeedCommand::Format(f) => out.push(*f),
        FeedCommand::Timecode(tc) => out.extend_from_slice(&tc.to_bytes()),
        FeedCommand::RefreshStart { start, end } => {
            out.extend_from_slice(&start.to_bytes());
            out.extend_from_slice(&end.to_bytes());
        }
        FeedCommand::Delete | FeedCommand::PreventSave | FeedCommand::RefreshEnd => {}
    }
    out.push(delimiters.end());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_commands() -> Vec<FeedCommand> {
        vec![
            FeedCommand::Page(258),
            FeedCommand::Line(12),
            FeedCommand::Format(2),
            FeedCommand::Timecode(Timecode::new(17, 5, 13, 5)),
            FeedCommand::Delete,
            FeedCommand::PreventSave,
            FeedCommand::RefreshStart {
                start: Timecode::new(17, 5, 13, 5),
                end: Timecode::new(17, 5, 14, 10),
            },
            FeedCommand::RefreshEnd,
        ]
    }

    #[test]
    fn test_round_trip_all_eight_commands() {
        for command in all_commands() {
            for delimiters in [Delimiters::Control, Delimiters::Bracket] {
                let frame = encode(&command, delimiters);
                assert_eq!(frame[0], delimiters.start());
                assert_eq!(*frame.last().unwrap(), delimiters.end());

                let decoded = decode(frame[1], &frame[2..frame.len() - 1]).unwrap();
                assert_eq!(decoded, command);
            }
        }
    }

    #[test]
    fn test_page_is_little_endian() {
        // 02 50 01 00 03 => Page(1)
        assert_eq!(decode(b'P', &[0x01, 0x00]).unwrap(), FeedCommand::Page(1));
        assert_eq!(decode(b'P', &[0x00, 0x01]).unwrap(), FeedCommand::Page(256));
    }

    #[test]
    fn test_timecode_is_positional_raw_bytes() {
        let decoded = decode(b'T', &[17, 5, 13, 5]).unwrap();
        assert_eq!(decoded, FeedCommand::Timecode(Timecode::new(17, 5, 13, 5)));

        // No range validation: the feed is authoritative.
        assert!(decode(b'T', &[99, 99, 99, 99]).is_ok());
    }

    #[test]
    fn test_refresh_start_packs_two_timecodes() {
        let decoded = decode(b'R', &[17, 5, 13, 5, 17, 5, 14, 10]).unwrap();
        assert_eq!(
            decoded,
            FeedCommand::RefreshStart {
                start: Timecode::new(17, 5, 13, 5),
                end: Timecode::new(17, 5, 14, 10),
            }
        );
    }

    #[test]
    fn test_unknown_letter() {
        assert!(matches!(
            decode(b'Z', &[]),
            Err(ProtocolError::UnknownCommand { letter: b'Z' })
        ));
    }

    #[test]
    fn test_truncated_payload_is_incomplete() {
        assert!(matches!(
            decode(b'T', &[17, 5]),
            Err(ProtocolError::Incomplete { need: 4, have: 2, .. })
        ));
    }

    #[test]
    fn test_payload_lengths_match_wire_spec() {
        for (letter, len) in [
            (b'P', 2),
            (b'N', 1),
            (b'F', 1),
            (b'T', 4),
            (b'D', 0),
            (b'K', 0),
            (b'R', 8),
            (b'E', 0),
        ] {
            assert_eq!(payload_len(letter), Some(len));
        }
        assert_eq!(payload_len(b'Z'), None);
    }
}
