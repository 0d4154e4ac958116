//! Feed connection handler - drives one parser per connection

use std::sync::Arc;
use stenolink_core::{SessionId, SessionManager};
use stenolink_protocol::{Delimiters, FeedItem, FeedParser, TranscriptEvent};
use tracing::{debug, info};

/// Handles a single vendor feed connection.
///
/// Owns exactly one parser and binds it to one session transcript. Driven
/// strictly sequentially by chunk arrival order; never shared across
/// tasks.
pub struct FeedHandler {
    /// Unique session ID for this connection
    pub session_id: SessionId,
    /// Session manager reference
    manager: Arc<SessionManager>,
    /// Per-connection feed parser
    parser: FeedParser,
}

impl FeedHandler {
    pub fn new(session_id: SessionId, manager: Arc<SessionManager>) -> Self {
        Self::with_delimiters(session_id, manager, Delimiters::Control)
    }

    pub fn with_delimiters(
        session_id: SessionId,
        manager: Arc<SessionManager>,
        delimiters: Delimiters,
    ) -> Self {
        manager.get_or_create(session_id.clone());
        Self {
            session_id,
            manager,
            parser: FeedParser::with_delimiters(delimiters),
        }
    }

    /// Process one received chunk: decode, store, publish.
    ///
    /// Live events are appended to the session transcript and broadcast;
    /// each completed refresh batch is applied as a single atomic splice
    /// and broadcast as a distinct message.
    pub fn process(&mut self, chunk: &[u8]) {
        let items = self.parser.feed(chunk);
        let mut pending: Vec<TranscriptEvent> = Vec::new();

        for item in items {
            match item {
                FeedItem::Event(event) => pending.push(event),
                FeedItem::Refresh(batch) => {
                    // Preserve ordering: flush live events ahead of the splice.
                    if !pending.is_empty() {
                        self.manager
                            .apply_events(&self.session_id, std::mem::take(&mut pending));
                    }
                    let outcome = self.manager.apply_refresh(&self.session_id, batch);
                    debug!(session = %self.session_id, ?outcome, "Refresh batch applied");
                }
            }
        }

        if !pending.is_empty() {
            self.manager.apply_events(&self.session_id, pending);
        }
    }

    /// Clean up when the connection closes.
    ///
    /// The in-flight partial frame and any unflushed refresh buffer are
    /// discarded, not replayed (accepted failure mode). The transcript
    /// itself stays memory-resident for queries.
    pub fn cleanup(&self) {
        let partial = self.parser.pending_bytes();
        let buffered = self.parser.pending_refresh_events();
        if partial > 0 || buffered > 0 {
            info!(
                session = %self.session_id,
                partial_frame_bytes = partial,
                refresh_events_dropped = buffered,
                "Connection closed mid-stream, in-flight decode state discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stenolink_protocol::{encode, FeedCommand, Timecode};

    fn handler(manager: &Arc<SessionManager>) -> FeedHandler {
        FeedHandler::new(SessionId::new("feed:test:0").unwrap(), manager.clone())
    }

    #[test]
    fn test_process_appends_to_transcript() {
        let manager = Arc::new(SessionManager::new());
        let mut h = handler(&manager);

        let mut bytes = encode(&FeedCommand::Format(1), Delimiters::Control);
        bytes.extend_from_slice(b"Q. Hi");
        h.process(&bytes);

        let transcript = manager.get(&h.session_id).unwrap();
        assert_eq!(transcript.text(), "Q. Hi");
    }

    #[test]
    fn test_refresh_replaces_live_span() {
        let manager = Arc::new(SessionManager::new());
        let mut h = handler(&manager);
        let tc = Timecode::new(17, 5, 13, 5);

        let mut bytes = encode(&FeedCommand::Format(2), Delimiters::Control);
        bytes.extend(encode(&FeedCommand::Timecode(tc), Delimiters::Control));
        bytes.extend_from_slice(b"A. At the ofice.");
        h.process(&bytes);

        let mut correction = encode(
            &FeedCommand::RefreshStart {
                start: tc,
                end: Timecode::new(17, 5, 14, 10),
            },
            Delimiters::Control,
        );
        correction.extend(encode(&FeedCommand::Timecode(tc), Delimiters::Control));
        correction.extend_from_slice(b"A. At the office.");
        correction.extend(encode(&FeedCommand::RefreshEnd, Delimiters::Control));
        h.process(&correction);

        let transcript = manager.get(&h.session_id).unwrap();
        assert_eq!(transcript.text(), "A. At the office.");
    }

    #[test]
    fn test_chunked_delivery_matches_whole_delivery() {
        let manager_a = Arc::new(SessionManager::new());
        let manager_b = Arc::new(SessionManager::new());
        let mut whole = handler(&manager_a);
        let mut chunked = handler(&manager_b);

        let mut bytes = encode(&FeedCommand::Page(3), Delimiters::Control);
        bytes.extend(encode(&FeedCommand::Format(1), Delimiters::Control));
        bytes.extend_from_slice(b"testimony text");

        whole.process(&bytes);
        for chunk in bytes.chunks(3) {
            chunked.process(chunk);
        }

        let a = manager_a.get(&whole.session_id).unwrap();
        let b = manager_b.get(&chunked.session_id).unwrap();
        assert_eq!(a.events(), b.events());
    }
}
