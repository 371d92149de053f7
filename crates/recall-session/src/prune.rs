//! History trimming and the eviction pass.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ConversationEntry;
use crate::priority::days_between;

/// How hard an in-place trim cuts history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Keep up to `max_history_entries`.
    Normal,
    /// Keep up to `aggressive_history_entries`.
    Aggressive,
}

/// Score used to rank entries for trimming: importance weight plus age in days.
pub fn trim_score(entry: &ConversationEntry, now: DateTime<Utc>) -> f64 {
    entry.importance.weight() + days_between(entry.timestamp, now)
}

/// Keep the `max_entries` highest-scoring entries, preserving insertion order.
///
/// Returns the number of entries removed. Ties keep the earlier entry.
pub fn trim_history(
    history: &mut Vec<ConversationEntry>,
    max_entries: usize,
    now: DateTime<Utc>,
) -> usize {
    if history.len() <= max_entries {
        return 0;
    }

    let mut ranked: Vec<(usize, f64)> = history
        .iter()
        .enumerate()
        .map(|(i, entry)| (i, trim_score(entry, now)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut keep = vec![false; history.len()];
    for (i, _) in ranked.into_iter().take(max_entries) {
        keep[i] = true;
    }

    let before = history.len();
    let mut flags = keep.into_iter();
    history.retain(|_| flags.next().unwrap_or(false));
    before - history.len()
}

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PruneReport {
    /// Aggregate bytes when the pass started.
    pub bytes_before: usize,
    /// Aggregate bytes when the pass finished.
    pub bytes_after: usize,
    /// History entries dropped by in-place trims.
    pub entries_trimmed: usize,
    /// Sessions removed, in eviction order.
    pub evicted: Vec<String>,
    /// Whether the pass got the aggregate to or below its target.
    pub reached_target: bool,
}

impl PruneReport {
    pub fn bytes_freed(&self) -> usize {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}
