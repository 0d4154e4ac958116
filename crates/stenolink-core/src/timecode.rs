//! Feed timecodes: hours/minutes/seconds/frames at 30 fps

use serde::{Deserialize, Serialize};

/// Frame rate of the vendor feed's timecodes.
pub const FRAMES_PER_SECOND: u32 = 30;

/// A feed timecode tagging a position in time.
///
/// The four fields arrive as raw positional bytes (not BCD). The feed is
/// authoritative, so values are accepted as given even when semantically
/// out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timecode {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
}

impl Timecode {
    pub fn new(hours: u8, minutes: u8, seconds: u8, frames: u8) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            frames,
        }
    }

    /// Decode four positional bytes `[HH, MM, SS, FF]`.
    pub fn from_bytes(b: [u8; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }

    /// Encode back to the wire layout.
    pub fn to_bytes(self) -> [u8; 4] {
        [self.hours, self.minutes, self.seconds, self.frames]
    }

    /// Total frame count since 00:00:00.00.
    pub fn total_frames(self) -> u32 {
        ((self.hours as u32 * 60 + self.minutes as u32) * 60 + self.seconds as u32)
            * FRAMES_PER_SECOND
            + self.frames as u32
    }

    /// Scalar position in seconds: `h*3600 + m*60 + s + f/30`.
    pub fn as_seconds(self) -> f64 {
        self.hours as f64 * 3600.0
            + self.minutes as f64 * 60.0
            + self.seconds as f64
            + self.frames as f64 / FRAMES_PER_SECOND as f64
    }
}

impl std::fmt::Display for Timecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        let tc = Timecode::new(17, 5, 13, 5);
        assert_eq!(Timecode::from_bytes(tc.to_bytes()), tc);
    }

    #[test]
    fn test_as_seconds() {
        let tc = Timecode::new(1, 2, 3, 15);
        assert_eq!(tc.as_seconds(), 3600.0 + 120.0 + 3.0 + 0.5);
    }

    #[test]
    fn test_monotonic_for_increasing_tuples() {
        let mut prev = Timecode::new(0, 0, 0, 0);
        for tuple in [
            (0, 0, 0, 1),
            (0, 0, 0, 29),
            (0, 0, 1, 0),
            (0, 1, 0, 0),
            (0, 59, 59, 29),
            (1, 0, 0, 0),
            (23, 59, 59, 29),
        ] {
            let tc = Timecode::new(tuple.0, tuple.1, tuple.2, tuple.3);
            assert!(tc > prev);
            assert!(tc.total_frames() > prev.total_frames());
            assert!(tc.as_seconds() > prev.as_seconds());
            prev = tc;
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Timecode::new(17, 5, 13, 5).to_string(), "17:05:13.05");
    }

    #[test]
    fn test_out_of_range_accepted() {
        // The feed is authoritative; 99h is stored verbatim.
        let tc = Timecode::from_bytes([99, 61, 61, 31]);
        assert_eq!(tc.hours, 99);
        assert!(tc.total_frames() > 0);
    }
}
