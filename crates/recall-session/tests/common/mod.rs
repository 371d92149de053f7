//! Shared helpers for context cache integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use recall_session::{CacheConfig, ContextCache, Importance, ManualClock};

/// Fixed start time for every test clock.
pub fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Config with expiry pushed far out so aging tests never hit it.
pub fn long_lived() -> CacheConfig {
    CacheConfig::new().with_max_age(Duration::from_secs(90 * 24 * 60 * 60))
}

/// Build a cache driven by a manual clock.
pub fn cache_with(config: CacheConfig) -> (ContextCache, ManualClock) {
    let clock = ManualClock::new(start());
    let cache = ContextCache::with_clock(config, Arc::new(clock.clone())).unwrap();
    (cache, clock)
}

/// Size in bytes of a session holding one entry with a `summary_len` summary.
///
/// Measured on a throwaway cache at the shared start time, so a session with
/// the same id length and content built in another cache has the same size.
pub fn probe_size(session_id: &str, summary_len: usize) -> usize {
    let (cache, _) = cache_with(long_lived());
    cache.append_entry(session_id, "topic", &"x".repeat(summary_len), Importance::Medium);
    cache.peek(session_id).unwrap().size_bytes()
}
