//! Session manager - transcript lifecycle and viewer fan-out

use crate::error::{Error, Result};
use crate::event::{RefreshBatch, TranscriptEvent};
use crate::reconcile::{ReconcileOutcome, ReconcilePolicy};
use crate::transcript::{SessionId, Transcript, TranscriptMeta};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Update sent to viewers.
///
/// Refresh batches are a distinct message type so subscribers can apply the
/// same windowed splice client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Update {
    /// Live events appended to a session transcript
    Events {
        session: SessionId,
        events: Vec<TranscriptEvent>,
    },

    /// A finalized refresh batch plus how the server applied it
    Refresh {
        session: SessionId,
        batch: RefreshBatch,
        outcome: ReconcileOutcome,
    },
}

impl Update {
    pub fn session(&self) -> &SessionId {
        match self {
            Update::Events { session, .. } => session,
            Update::Refresh { session, .. } => session,
        }
    }
}

/// Owns all session transcripts and the broadcast channel to viewers.
pub struct SessionManager {
    /// All sessions indexed by ID
    sessions: DashMap<String, Arc<Transcript>>,
    /// Broadcast channel for transcript updates
    update_sender: broadcast::Sender<Update>,
    /// Windowed-match tuning shared by every session
    policy: ReconcilePolicy,
}

impl SessionManager {
    /// Create a new session manager with the default reconcile policy
    pub fn new() -> Self {
        Self::with_policy(ReconcilePolicy::default())
    }

    pub fn with_policy(policy: ReconcilePolicy) -> Self {
        let (update_sender, _) = broadcast::channel(10000);

        Self {
            sessions: DashMap::new(),
            update_sender,
            policy,
        }
    }

    /// Get an existing session
    pub fn get(&self, id: &SessionId) -> Result<Arc<Transcript>> {
        self.sessions
            .get(id.as_str())
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Get or create a session transcript
    pub fn get_or_create(&self, id: SessionId) -> Arc<Transcript> {
        let key = id.as_str().to_string();

        self.sessions
            .entry(key)
            .or_insert_with(|| Arc::new(Transcript::new(id)))
            .value()
            .clone()
    }

    /// List all session transcripts
    pub fn list(&self) -> Vec<TranscriptMeta> {
        self.sessions
            .iter()
            .map(|entry| entry.value().meta())
            .collect()
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Append live events to a session and publish them to viewers.
    pub fn apply_events(&self, id: &SessionId, events: Vec<TranscriptEvent>) {
        if events.is_empty() {
            return;
        }
        let transcript = self.get_or_create(id.clone());
        transcript.append(&events);
        let _ = self.update_sender.send(Update::Events {
            session: id.clone(),
            events,
        });
    }

    /// Apply a refresh batch atomically and publish it to viewers.
    pub fn apply_refresh(&self, id: &SessionId, batch: RefreshBatch) -> ReconcileOutcome {
        let transcript = self.get_or_create(id.clone());
        let outcome = transcript.apply_refresh(batch.clone(), &self.policy);

        if outcome.is_unreconciled() {
            warn!(
                session = %id,
                window_start = %batch.window_start,
                window_end = %batch.window_end,
                events = batch.events.len(),
                "Unreconciled replay: no span matched the refresh window, batch appended"
            );
        }

        let _ = self.update_sender.send(Update::Refresh {
            session: id.clone(),
            batch,
            outcome,
        });
        outcome
    }

    /// Subscribe to transcript updates
    pub fn subscribe(&self) -> broadcast::Receiver<Update> {
        self.update_sender.subscribe()
    }

    /// Get statistics
    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            session_count: self.sessions.len(),
            subscriber_count: self.update_sender.receiver_count(),
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple glob pattern matching for viewer subscriptions
pub fn matches_pattern(key: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return key.starts_with(prefix);
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return key.ends_with(suffix);
    }

    key == pattern
}

/// Manager statistics
#[derive(Debug, Clone)]
pub struct ManagerStats {
    pub session_count: usize,
    pub subscriber_count: usize,
}
