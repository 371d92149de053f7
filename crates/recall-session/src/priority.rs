//! Eviction priority scoring.
//!
//! ```text
//! recency   = max(0, 1 - days_since_access / 7)
//! activity  = min(1, access_count / 10)
//! freshness = max(0, 1 - days_since_update / 3)
//! size      = max(0, 1 - total_size_bytes / max_session_size_bytes)
//! priority  = 0.30*recency + 0.20*activity + 0.30*freshness + 0.20*size
//! ```
//!
//! Higher means more worth keeping. Pruning evicts from the bottom.

use chrono::{DateTime, Utc};

use crate::model::SessionRecord;

pub const RECENCY_WEIGHT: f64 = 0.30;
pub const ACTIVITY_WEIGHT: f64 = 0.20;
pub const FRESHNESS_WEIGHT: f64 = 0.30;
pub const SIZE_WEIGHT: f64 = 0.20;

/// Days for the recency score to decay to zero.
pub const RECENCY_WINDOW_DAYS: f64 = 7.0;
/// Accesses at which the activity score saturates.
pub const ACTIVITY_SATURATION: f64 = 10.0;
/// Days for the freshness score to decay to zero.
pub const FRESHNESS_WINDOW_DAYS: f64 = 3.0;

/// Sessions scoring below this may be evicted under memory pressure.
pub const EVICTION_THRESHOLD: f64 = 0.3;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days from `then` to `now`, clamped at zero.
pub fn days_between(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = now.signed_duration_since(then).num_milliseconds();
    (millis as f64 / MILLIS_PER_DAY).max(0.0)
}

/// Individual score components, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityBreakdown {
    pub recency: f64,
    pub activity: f64,
    pub freshness: f64,
    pub size: f64,
}

impl PriorityBreakdown {
    pub fn compute(record: &SessionRecord, max_session_size_bytes: usize, now: DateTime<Utc>) -> Self {
        let days_since_access = days_between(record.last_accessed_at, now);
        let days_since_update = days_between(record.last_updated_at, now);
        let size_ratio = record.size_bytes() as f64 / max_session_size_bytes.max(1) as f64;

        Self {
            recency: (1.0 - days_since_access / RECENCY_WINDOW_DAYS).max(0.0),
            activity: (record.access_count as f64 / ACTIVITY_SATURATION).min(1.0),
            freshness: (1.0 - days_since_update / FRESHNESS_WINDOW_DAYS).max(0.0),
            size: (1.0 - size_ratio).max(0.0),
        }
    }

    /// Weighted sum of the components.
    pub fn total(&self) -> f64 {
        let sum = RECENCY_WEIGHT * self.recency
            + ACTIVITY_WEIGHT * self.activity
            + FRESHNESS_WEIGHT * self.freshness
            + SIZE_WEIGHT * self.size;
        // Float rounding only.
        sum.clamp(0.0, 1.0)
    }
}

/// Priority of a record at `now`, in [0, 1].
pub fn priority(record: &SessionRecord, max_session_size_bytes: usize, now: DateTime<Utc>) -> f64 {
    PriorityBreakdown::compute(record, max_session_size_bytes, now).total()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use chrono::TimeDelta;

    const MAX_SESSION: usize = 10_000;

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn record_with(size: usize, access_count: u64) -> SessionRecord {
        let mut record = SessionRecord::new("s1", &CacheConfig::default(), base());
        record.context.memory_usage.total_size_bytes = size;
        record.access_count = access_count;
        record
    }

    #[test]
    fn test_fresh_record_components() {
        let record = record_with(2_500, 5);
        let parts = PriorityBreakdown::compute(&record, MAX_SESSION, base());

        assert_eq!(parts.recency, 1.0);
        assert_eq!(parts.freshness, 1.0);
        assert_eq!(parts.activity, 0.5);
        assert_eq!(parts.size, 0.75);
        let expected = 0.30 + 0.20 * 0.5 + 0.30 + 0.20 * 0.75;
        assert!((parts.total() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_decay_windows() {
        let record = record_with(0, 0);

        let p = PriorityBreakdown::compute(&record, MAX_SESSION, base() + TimeDelta::days(1));
        assert!((p.freshness - 2.0 / 3.0).abs() < 1e-12);
        assert!((p.recency - 6.0 / 7.0).abs() < 1e-12);

        let p = PriorityBreakdown::compute(&record, MAX_SESSION, base() + TimeDelta::days(3));
        assert_eq!(p.freshness, 0.0);

        let p = PriorityBreakdown::compute(&record, MAX_SESSION, base() + TimeDelta::days(30));
        assert_eq!(p.recency, 0.0);
        assert_eq!(p.freshness, 0.0);
    }

    #[test]
    fn test_activity_saturates() {
        let record = record_with(0, 500);
        let p = PriorityBreakdown::compute(&record, MAX_SESSION, base());
        assert_eq!(p.activity, 1.0);
    }

    #[test]
    fn test_oversized_session_scores_zero_on_size() {
        let record = record_with(MAX_SESSION * 3, 0);
        let p = PriorityBreakdown::compute(&record, MAX_SESSION, base());
        assert_eq!(p.size, 0.0);
    }

    #[test]
    fn test_priority_bounds() {
        let sizes = [0, 1, MAX_SESSION / 2, MAX_SESSION, MAX_SESSION * 10];
        let counts = [0, 1, 9, 10, 11, u64::MAX];
        let offsets = [
            TimeDelta::days(-5),
            TimeDelta::zero(),
            TimeDelta::hours(1),
            TimeDelta::days(2),
            TimeDelta::days(8),
            TimeDelta::days(3650),
        ];

        for size in sizes {
            for count in counts {
                for offset in offsets {
                    let record = record_with(size, count);
                    let p = priority(&record, MAX_SESSION, base() + offset);
                    assert!((0.0..=1.0).contains(&p), "priority {p} out of range");
                }
            }
        }
    }

    #[test]
    fn test_maximum_priority_is_one() {
        let record = record_with(0, 10);
        assert!((priority(&record, MAX_SESSION, base()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_days_between_clamps_negative() {
        assert_eq!(days_between(base(), base() - TimeDelta::hours(5)), 0.0);
        assert!((days_between(base(), base() + TimeDelta::hours(12)) - 0.5).abs() < 1e-12);
    }
}
