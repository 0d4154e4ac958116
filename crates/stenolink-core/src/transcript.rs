//! Per-session transcript store

use crate::error::{Error, Result};
use crate::event::{FeedCommand, RefreshBatch, TranscriptEvent};
use crate::paragraph::{paragraphs, Paragraph};
use crate::reconcile::{splice, ReconcileOutcome, ReconcilePolicy};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Session identifier - UTF-8 string, max 512 bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID, validating the format
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidSessionId("Session ID cannot be empty".into()));
        }

        if id.len() > 512 {
            return Err(Error::InvalidSessionId("Session ID exceeds 512 bytes".into()));
        }

        // Validate pattern: [a-zA-Z0-9:._-]+ (peer addresses contain dots)
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ':' || c == '.' || c == '_' || c == '-')
        {
            return Err(Error::InvalidSessionId(
                "Session ID must match pattern [a-zA-Z0-9:._-]+".into(),
            ));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transcript metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMeta {
    pub id: SessionId,
    pub created_at: u64,
    pub updated_at: u64,
    pub version: u64,
    /// Sticky flag raised by the K (prevent-saving) command.
    pub prevent_save: bool,
}

impl TranscriptMeta {
    pub fn new(id: SessionId) -> Self {
        let now = now_ms();

        Self {
            id,
            created_at: now,
            updated_at: now,
            version: 1,
            prevent_save: false,
        }
    }
}

/// The ordered, memory-resident transcript of one feed session.
///
/// Lives for the process lifetime; a refresh splice is a single
/// synchronized mutation, so readers never observe a half-applied batch.
pub struct Transcript {
    meta: RwLock<TranscriptMeta>,
    events: RwLock<Vec<TranscriptEvent>>,
}

impl Transcript {
    pub fn new(id: SessionId) -> Self {
        Self {
            meta: RwLock::new(TranscriptMeta::new(id)),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Get the session ID
    pub fn id(&self) -> SessionId {
        self.meta.read().id.clone()
    }

    /// Get transcript metadata
    pub fn meta(&self) -> TranscriptMeta {
        self.meta.read().clone()
    }

    /// Get the current version
    pub fn version(&self) -> u64 {
        self.meta.read().version
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Append live events in arrival order.
    pub fn append(&self, events: &[TranscriptEvent]) {
        if events.is_empty() {
            return;
        }

        let prevent = events.iter().any(|event| {
            matches!(
                event,
                TranscriptEvent::Command {
                    command: FeedCommand::PreventSave,
                    ..
                }
            )
        });

        self.events.write().extend_from_slice(events);
        if prevent {
            self.meta.write().prevent_save = true;
        }
        self.touch();
    }

    /// Apply a refresh batch as one atomic splice.
    pub fn apply_refresh(&self, batch: RefreshBatch, policy: &ReconcilePolicy) -> ReconcileOutcome {
        let outcome = {
            let mut events = self.events.write();
            splice(&mut events, batch, policy)
        };
        self.touch();
        outcome
    }

    /// Snapshot of the ordered events.
    pub fn events(&self) -> Vec<TranscriptEvent> {
        self.events.read().clone()
    }

    /// Reconstructed paragraphs, including the trailing open run.
    pub fn paragraphs(&self) -> Vec<Paragraph> {
        paragraphs(&self.events.read())
    }

    /// Plain transcript text, one paragraph per line.
    pub fn text(&self) -> String {
        self.paragraphs()
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn touch(&self) {
        let mut meta = self.meta.write();
        meta.version += 1;
        meta.updated_at = now_ms();
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("meta", &self.meta)
            .field("events", &self.events.read().len())
            .finish()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::Timecode;

    fn text_at(ch: char, tc: Timecode) -> TranscriptEvent {
        TranscriptEvent::Text {
            ch,
            page: 1,
            line: 1,
            format: 1,
            timecode: Some(tc),
        }
    }

    #[test]
    fn test_session_id_valid() {
        assert!(SessionId::new("feed:127.0.0.1:55132:0").is_ok());
        assert!(SessionId::new("courtroom_4-b").is_ok());
    }

    #[test]
    fn test_session_id_invalid() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("feed/0").is_err()); // invalid char
        assert!(SessionId::new("a".repeat(513)).is_err()); // too long
    }

    #[test]
    fn test_append_and_query() {
        let transcript = Transcript::new(SessionId::new("test:1").unwrap());
        let tc = Timecode::new(0, 0, 1, 0);

        transcript.append(&[text_at('h', tc), text_at('i', tc)]);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.text(), "hi");
    }

    #[test]
    fn test_append_bumps_version() {
        let transcript = Transcript::new(SessionId::new("test:2").unwrap());
        let v = transcript.version();
        transcript.append(&[text_at('x', Timecode::new(0, 0, 0, 1))]);
        assert!(transcript.version() > v);
    }

    #[test]
    fn test_prevent_save_flag_is_sticky() {
        let transcript = Transcript::new(SessionId::new("test:3").unwrap());
        assert!(!transcript.meta().prevent_save);

        transcript.append(&[TranscriptEvent::Command {
            command: FeedCommand::PreventSave,
            page: 0,
            line: 0,
        }]);
        assert!(transcript.meta().prevent_save);

        transcript.append(&[text_at('x', Timecode::new(0, 0, 0, 1))]);
        assert!(transcript.meta().prevent_save);
    }

    #[test]
    fn test_refresh_replaces_in_place() {
        let transcript = Transcript::new(SessionId::new("test:4").unwrap());
        let stale = Timecode::new(17, 5, 13, 5);
        let after = Timecode::new(17, 5, 20, 0);
        transcript.append(&[text_at('a', stale), text_at('b', stale), text_at('c', after)]);

        let batch = RefreshBatch {
            window_start: stale,
            window_end: Timecode::new(17, 5, 14, 10),
            events: vec![text_at('X', stale)],
        };
        let outcome = transcript.apply_refresh(batch, &ReconcilePolicy::default());

        assert_eq!(outcome, ReconcileOutcome::Window { start: 0, removed: 2 });
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.text(), "Xc");
    }
}
