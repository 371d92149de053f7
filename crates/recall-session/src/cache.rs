//! Conversation context cache with priority-scored pruning.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::model::{ContextPatch, ConversationEntry, Importance, SessionRecord};
use crate::priority::{EVICTION_THRESHOLD, priority};
use crate::prune::{PruneReport, TrimMode, trim_history};
use crate::render::render_record;

/// How a lookup found (or did not find) a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Live,
    Expired,
    Missing,
}

/// Whether resolving a session counts as an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Inner state protected by the mutex.
#[derive(Default)]
struct Registry {
    sessions: HashMap<String, SessionRecord>,

    /// Sum of every record's `total_size_bytes`.
    total_bytes: usize,

    /// Sessions evicted under memory pressure since construction or `clear_all`.
    evicted_total: u64,
}

impl Registry {
    fn lookup(&self, session_id: &str, config: &CacheConfig, now: DateTime<Utc>) -> Lookup {
        match self.sessions.get(session_id) {
            None => Lookup::Missing,
            Some(record) if record.is_expired(config, now) => Lookup::Expired,
            Some(_) => Lookup::Live,
        }
    }

    fn insert(&mut self, record: SessionRecord) {
        self.total_bytes += record.size_bytes();
        if let Some(old) = self.sessions.insert(record.session_id.clone(), record) {
            self.total_bytes -= old.size_bytes();
        }
    }

    fn remove(&mut self, session_id: &str) -> Option<SessionRecord> {
        let record = self.sessions.remove(session_id)?;
        self.total_bytes -= record.size_bytes();
        Some(record)
    }

    /// Run `f` on a record, then recompute its size and the aggregate.
    fn mutate<R>(&mut self, session_id: &str, f: impl FnOnce(&mut SessionRecord) -> R) -> Option<R> {
        let record = self.sessions.get_mut(session_id)?;
        let before = record.size_bytes();
        let out = f(record);
        let after = record.refresh_size();
        self.total_bytes = self.total_bytes - before + after;
        Some(out)
    }
}

/// Process-wide store of per-session conversation context.
///
/// This cache provides:
/// - Lazy session creation with age-based expiry
/// - Shallow, typed context updates and bounded conversation history
/// - A memory budget enforced by trimming history and evicting the
///   lowest-priority sessions
///
/// All state sits behind one mutex. Every method is synchronous and the
/// cache never spawns work of its own; see
/// [`ExpirySweeper`](crate::ExpirySweeper) for periodic expiry.
pub struct ContextCache {
    inner: Arc<Mutex<Registry>>,
    config: Arc<CacheConfig>,
    clock: Arc<dyn Clock>,
}

impl ContextCache {
    /// Create a cache driven by the system clock.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Registry::default())),
            config: Arc::new(config),
            clock,
        })
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }

    /// Current aggregate size of all sessions in bytes.
    pub fn memory_usage_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }

    /// Check if a live (non-expired) session exists, without touching it.
    pub fn contains(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        self.inner.lock().lookup(session_id, &self.config, now) == Lookup::Live
    }

    /// Get a session, creating it if it is missing or expired.
    ///
    /// Existing sessions have their access time and count bumped. The
    /// memory budget is checked afterwards, so reads alone keep memory
    /// bounded.
    pub fn get_or_create(&self, session_id: &str) -> SessionRecord {
        let now = self.clock.now();
        let mut reg = self.inner.lock();

        self.resolve(&mut reg, session_id, now, Access::Read);
        self.rescore(&mut reg, session_id, now);

        self.maybe_prune(&mut reg, now);

        match reg.sessions.get(session_id) {
            Some(record) => record.clone(),
            None => {
                // A just-accessed record scores above the eviction threshold,
                // so the pass that ran above cannot have removed it.
                debug!(session_id = %session_id, "Accessed session missing after pruning; recreating");
                let record = SessionRecord::new(session_id, &self.config, now);
                reg.insert(record.clone());
                record
            }
        }
    }

    /// Apply a partial context update.
    ///
    /// Present fields replace the stored value; absent fields are untouched.
    pub fn update(&self, session_id: &str, patch: ContextPatch) {
        let now = self.clock.now();
        let mut reg = self.inner.lock();

        self.resolve(&mut reg, session_id, now, Access::Write);
        reg.mutate(session_id, |record| {
            patch.apply(&mut record.context);
            record.last_updated_at = now;
        });
        self.rescore(&mut reg, session_id, now);
        trace!(session_id = %session_id, "Session context updated");

        self.maybe_prune(&mut reg, now);
    }

    /// Append a summarized conversation turn to a session's history.
    pub fn append_entry(
        &self,
        session_id: &str,
        topic: &str,
        summary: &str,
        importance: Importance,
    ) {
        let now = self.clock.now();
        let mut reg = self.inner.lock();
        let limit = self.config.history_limit(TrimMode::Normal);

        self.resolve(&mut reg, session_id, now, Access::Write);
        let trimmed = reg.mutate(session_id, |record| {
            record
                .history
                .push(ConversationEntry::new(topic, summary, importance, now));
            record.last_updated_at = now;

            let trimmed = trim_history(&mut record.history, limit, now);
            if trimmed > 0 {
                record.context.memory_usage.last_pruned_at = Some(now);
            }
            trimmed
        });
        self.rescore(&mut reg, session_id, now);

        if let Some(trimmed) = trimmed.filter(|n| *n > 0) {
            debug!(session_id = %session_id, trimmed, "Trimmed conversation history");
        }

        self.maybe_prune(&mut reg, now);
    }

    /// Push an action label onto the session's recent actions, keeping only
    /// the newest `max_recent_actions`.
    pub fn record_action(&self, session_id: &str, action: &str) {
        let now = self.clock.now();
        let mut reg = self.inner.lock();
        let max = self.config.max_recent_actions;

        self.resolve(&mut reg, session_id, now, Access::Write);
        reg.mutate(session_id, |record| {
            let actions = &mut record.context.preferences.recent_actions;
            actions.push(action.to_string());
            let excess = actions.len().saturating_sub(max);
            actions.drain(..excess);
            record.last_updated_at = now;
        });
        self.rescore(&mut reg, session_id, now);

        self.maybe_prune(&mut reg, now);
    }

    /// Render a text digest of a session for prompt construction.
    ///
    /// Read-only: missing or expired sessions render as an empty string and
    /// nothing is created or touched.
    pub fn render_context(&self, session_id: &str) -> String {
        let now = self.clock.now();
        let reg = self.inner.lock();
        match reg.sessions.get(session_id) {
            Some(record) if !record.is_expired(&self.config, now) => {
                render_record(record, self.config.render_history_limit)
            }
            _ => String::new(),
        }
    }

    /// Snapshot a live session without updating access statistics.
    pub fn peek(&self, session_id: &str) -> Option<SessionRecord> {
        let now = self.clock.now();
        let reg = self.inner.lock();
        reg.sessions
            .get(session_id)
            .filter(|record| !record.is_expired(&self.config, now))
            .cloned()
    }

    /// Remove a session explicitly.
    pub fn remove(&self, session_id: &str) -> Option<SessionRecord> {
        let removed = self.inner.lock().remove(session_id);
        if removed.is_some() {
            debug!(session_id = %session_id, "Session removed");
        }
        removed
    }

    /// Remove every session not updated within `max_age`.
    ///
    /// Intended to be run periodically by the owning process.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut reg = self.inner.lock();

        let expired: Vec<String> = reg
            .sessions
            .values()
            .filter(|record| record.is_expired(&self.config, now))
            .map(|record| record.session_id.clone())
            .collect();

        for session_id in &expired {
            debug!(session_id = %session_id, "Sweeping expired session");
            reg.remove(session_id);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), remaining = reg.sessions.len(), "Swept expired sessions");
        }

        expired.len()
    }

    /// Run a pruning pass regardless of current memory usage.
    pub fn force_pruning(&self) -> PruneReport {
        let now = self.clock.now();
        let mut reg = self.inner.lock();
        self.prune(&mut reg, now)
    }

    /// Every session with a freshly computed priority, highest first.
    pub fn sessions_by_priority(&self) -> Vec<SessionPriority> {
        let now = self.clock.now();
        let mut reg = self.inner.lock();

        let mut sessions: Vec<SessionPriority> = reg
            .sessions
            .values_mut()
            .map(|record| {
                let score = priority(record, self.config.max_session_size_bytes, now);
                record.context.memory_usage.priority_score = score;
                SessionPriority {
                    session_id: record.session_id.clone(),
                    priority: score,
                    memory_usage_bytes: record.size_bytes(),
                    last_accessed_at: record.last_accessed_at,
                }
            })
            .collect();

        sessions.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        sessions
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let reg = self.inner.lock();
        let total_sessions = reg.sessions.len();

        CacheStats {
            total_sessions,
            total_memory_usage_bytes: reg.total_bytes,
            average_session_size_bytes: if total_sessions == 0 {
                0
            } else {
                reg.total_bytes / total_sessions
            },
            oldest_access: reg.sessions.values().map(|r| r.last_accessed_at).min(),
            newest_access: reg.sessions.values().map(|r| r.last_accessed_at).max(),
            pruned_sessions_count: reg
                .sessions
                .values()
                .filter(|r| r.context.memory_usage.last_pruned_at.is_some())
                .count(),
            evicted_sessions_total: reg.evicted_total,
        }
    }

    /// Drop every session and reset counters.
    pub fn clear_all(&self) {
        let mut reg = self.inner.lock();
        let count = reg.sessions.len();
        *reg = Registry::default();
        debug!(count, "Cleared all sessions");
    }

    /// Make sure a live record exists for `session_id`.
    fn resolve(&self, reg: &mut Registry, session_id: &str, now: DateTime<Utc>, access: Access) {
        match reg.lookup(session_id, &self.config, now) {
            Lookup::Live => {
                if access == Access::Read
                    && let Some(record) = reg.sessions.get_mut(session_id)
                {
                    record.last_accessed_at = now;
                    record.access_count += 1;
                    trace!(session_id = %session_id, access_count = record.access_count, "Session found in cache");
                }
            }
            Lookup::Expired => {
                debug!(session_id = %session_id, "Session expired, replacing with a fresh one");
                reg.insert(SessionRecord::new(session_id, &self.config, now));
            }
            Lookup::Missing => {
                reg.insert(SessionRecord::new(session_id, &self.config, now));
                debug!(
                    session_id = %session_id,
                    cache_size = reg.sessions.len(),
                    "Session created"
                );
            }
        }
    }

    /// Store a fresh priority score on the record.
    ///
    /// The score is left out of the stored size; it only moves by a few
    /// digits and is recomputed on every mutation.
    fn rescore(&self, reg: &mut Registry, session_id: &str, now: DateTime<Utc>) {
        if let Some(record) = reg.sessions.get_mut(session_id) {
            record.context.memory_usage.priority_score =
                priority(record, self.config.max_session_size_bytes, now);
        }
    }

    fn over_trigger(&self, reg: &Registry) -> bool {
        reg.total_bytes as f64 / self.config.max_total_memory_bytes as f64
            > self.config.trigger_ratio
    }

    fn maybe_prune(&self, reg: &mut Registry, now: DateTime<Utc>) {
        if self.over_trigger(reg) {
            self.prune(reg, now);
        }
    }

    /// One pass over every session, lowest priority first.
    ///
    /// Each visited session is trimmed aggressively; if the aggregate is
    /// still above target and the session scores below the eviction
    /// threshold, it is removed. The pass stops once the aggregate is at or
    /// below target and never loops: an aggregate left above the cap is
    /// revisited on the next triggering call.
    fn prune(&self, reg: &mut Registry, now: DateTime<Utc>) -> PruneReport {
        let target = self.config.target_bytes();
        let aggressive = self.config.history_limit(TrimMode::Aggressive);
        let mut report = PruneReport {
            bytes_before: reg.total_bytes,
            ..Default::default()
        };

        let mut order: Vec<(String, f64)> = reg
            .sessions
            .values_mut()
            .map(|record| {
                let score = priority(record, self.config.max_session_size_bytes, now);
                record.context.memory_usage.priority_score = score;
                (record.session_id.clone(), score)
            })
            .collect();
        order.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        for (session_id, score) in order {
            if reg.total_bytes as f64 <= target {
                break;
            }

            let needs_trim = reg
                .sessions
                .get(&session_id)
                .is_some_and(|record| record.history.len() > aggressive);
            if needs_trim {
                let trimmed = reg
                    .mutate(&session_id, |record| {
                        let n = trim_history(&mut record.history, aggressive, now);
                        record.context.memory_usage.last_pruned_at = Some(now);
                        n
                    })
                    .unwrap_or(0);
                report.entries_trimmed += trimmed;
                trace!(session_id = %session_id, trimmed, "Trimmed session during pruning");
            }

            if reg.total_bytes as f64 > target && score < EVICTION_THRESHOLD {
                if let Some(record) = reg.remove(&session_id) {
                    info!(
                        session_id = %session_id,
                        priority = score,
                        freed_bytes = record.size_bytes(),
                        "Evicted low-priority session"
                    );
                    reg.evicted_total += 1;
                    report.evicted.push(session_id);
                }
            }
        }

        report.bytes_after = reg.total_bytes;
        report.reached_target = reg.total_bytes as f64 <= target;

        if reg.total_bytes > self.config.max_total_memory_bytes {
            warn!(
                total_bytes = reg.total_bytes,
                cap_bytes = self.config.max_total_memory_bytes,
                "Pruning pass left memory above the hard cap; will retry on next access"
            );
        } else {
            debug!(
                bytes_before = report.bytes_before,
                bytes_after = report.bytes_after,
                trimmed = report.entries_trimmed,
                evicted = report.evicted.len(),
                "Pruning pass complete"
            );
        }

        report
    }
}

impl Clone for ContextCache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: Arc::clone(&self.config),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Current number of stored sessions.
    pub total_sessions: usize,

    /// Aggregate size of all sessions in bytes.
    pub total_memory_usage_bytes: usize,

    /// Aggregate size divided by session count, or 0 when empty.
    pub average_session_size_bytes: usize,

    /// Earliest `last_accessed_at` across sessions.
    pub oldest_access: Option<DateTime<Utc>>,

    /// Latest `last_accessed_at` across sessions.
    pub newest_access: Option<DateTime<Utc>>,

    /// Live sessions whose history has been trimmed at least once.
    pub pruned_sessions_count: usize,

    /// Sessions evicted under memory pressure.
    pub evicted_sessions_total: u64,
}

/// Priority listing entry for monitoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPriority {
    /// Session identifier.
    pub session_id: String,
    /// Priority score in `[0, 1]`, computed at listing time.
    pub priority: f64,
    /// Stored size of the session in bytes.
    pub memory_usage_bytes: usize,
    /// When the session was last read.
    pub last_accessed_at: DateTime<Utc>,
}
