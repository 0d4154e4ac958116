//! Replay reconciliation: splicing refresh batches into an ordered transcript
//!
//! Matching proceeds exact window, then nearest prior event within
//! tolerance, then append. The order reflects real feed imprecision:
//! tightening it loses legitimate replacements, loosening it risks
//! corrupting unrelated spans.

use crate::event::{RefreshBatch, TranscriptEvent};
use serde::{Deserialize, Serialize};

/// Tuning for the windowed match.
///
/// The tolerance is configuration, not a protocol guarantee; vendor
/// timecodes are imprecise and the useful value varies per feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Maximum distance in seconds between a candidate event and the start
    /// of the refresh window for the nearest-prior fallback.
    pub start_tolerance_secs: f64,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            start_tolerance_secs: 5.0,
        }
    }
}

/// How a refresh batch was applied to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// A contiguous run of in-window events was replaced in place.
    Window { start: usize, removed: usize },

    /// No event fell inside the window; the nearest prior event within
    /// tolerance was replaced.
    NearestPrior { index: usize },

    /// No candidate at all; the batch was appended (unreconciled replay).
    Appended,
}

impl ReconcileOutcome {
    /// True when the batch could not be matched to an existing span.
    pub fn is_unreconciled(&self) -> bool {
        matches!(self, ReconcileOutcome::Appended)
    }
}

/// Splice `batch` into `events` in place, preserving overall order.
///
/// Partial application is never acceptable: callers must hold whatever lock
/// guards `events` across the whole call.
pub fn splice(
    events: &mut Vec<TranscriptEvent>,
    batch: RefreshBatch,
    policy: &ReconcilePolicy,
) -> ReconcileOutcome {
    let start = batch.window_start.as_seconds();
    let end = batch.window_end.as_seconds();
    // Swap forgivingly if the feed sent the window inverted.
    let (start, end) = if end < start { (end, start) } else { (start, end) };

    if let Some((i, j)) = window_run(events, start, end) {
        let removed = j - i + 1;
        events.splice(i..=j, batch.events);
        return ReconcileOutcome::Window { start: i, removed };
    }

    if let Some(i) = nearest_prior(events, start, policy.start_tolerance_secs) {
        events.splice(i..=i, batch.events);
        return ReconcileOutcome::NearestPrior { index: i };
    }

    events.extend(batch.events);
    ReconcileOutcome::Appended
}

/// Maximal contiguous run `[i, j]` whose timecoded events all fall within
/// `[start, end]` inclusive.
///
/// Untimecoded events (commands, text before the first T) extend a run but
/// cannot begin or end one.
fn window_run(events: &[TranscriptEvent], start: f64, end: f64) -> Option<(usize, usize)> {
    let mut first = None;
    let mut last = None;
    for (idx, event) in events.iter().enumerate() {
        let Some(tc) = event.timecode() else { continue };
        let secs = tc.as_seconds();
        if secs >= start && secs <= end {
            if first.is_none() {
                first = Some(idx);
            }
            last = Some(idx);
        } else if first.is_some() {
            break;
        }
    }
    first.zip(last)
}

/// Most recent event whose timecode is at or before `start` and within
/// `tolerance` seconds of it.
fn nearest_prior(events: &[TranscriptEvent], start: f64, tolerance: f64) -> Option<usize> {
    events.iter().enumerate().rev().find_map(|(idx, event)| {
        let secs = event.timecode()?.as_seconds();
        (secs <= start && start - secs <= tolerance).then_some(idx)
    })
}
