//! Stenolink Core - Transcript Store and Replay Reconciliation
//!
//! This crate provides the core data model for Stenolink:
//! - Timecode-tagged transcript events and refresh batches
//! - Per-session, memory-resident transcript storage
//! - Windowed replay reconciliation (the "refresh" splice)
//! - Paragraph reconstruction for display and query

pub mod error;
pub mod event;
pub mod manager;
pub mod paragraph;
pub mod reconcile;
pub mod timecode;
pub mod transcript;

pub use error::{Error, Result};
pub use event::{FeedCommand, RefreshBatch, TranscriptEvent};
pub use manager::{SessionManager, Update};
pub use paragraph::{paragraphs, Paragraph, ParagraphBuilder};
pub use reconcile::{splice, ReconcileOutcome, ReconcilePolicy};
pub use timecode::Timecode;
pub use transcript::{SessionId, Transcript, TranscriptMeta};
