//! Size and token estimation.

use std::io;

use crate::model::SessionRecord;

/// UTF-8 bytes per estimated token.
pub const BYTES_PER_TOKEN: usize = 4;

/// Estimate the token count of an entry: `ceil(utf8_len(topic + summary) / 4)`.
pub fn estimate_tokens(topic: &str, summary: &str) -> usize {
    (topic.len() + summary.len()).div_ceil(BYTES_PER_TOKEN)
}

/// Writer that only counts the bytes it is given.
#[derive(Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Decimal digits needed to print `n`.
fn digits(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

/// Serialized JSON size of a record in bytes.
///
/// The record embeds its own `total_size_bytes`, so the measured length is
/// settled to the size the record has once it carries that value. Streams
/// into a counter rather than building the buffer.
pub fn record_size(record: &SessionRecord) -> usize {
    let mut counter = ByteCounter::default();
    if let Err(e) = serde_json::to_writer(&mut counter, record) {
        // Partial count is a lower bound.
        tracing::warn!(session_id = %record.session_id, error = %e, "Failed to size session record");
    }

    let embedded = record.context.memory_usage.total_size_bytes;
    let base = counter.0.saturating_sub(digits(embedded));
    let mut size = counter.0;
    loop {
        let next = base + digits(size);
        if next == size {
            return size;
        }
        size = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::model::{ConversationEntry, Importance};
    use chrono::DateTime;

    #[test]
    fn test_forty_bytes_is_ten_tokens() {
        let topic = "a".repeat(15);
        let summary = "b".repeat(25);
        assert_eq!(estimate_tokens(&topic, &summary), 10);
    }

    #[test]
    fn test_token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("", ""), 0);
        assert_eq!(estimate_tokens("a", ""), 1);
        assert_eq!(estimate_tokens("abcd", "e"), 2);
    }

    #[test]
    fn test_token_estimate_counts_utf8_bytes() {
        // "é" is two bytes, so eight of them are 16 bytes.
        assert_eq!(estimate_tokens("éééé", "éééé"), 4);
    }

    #[test]
    fn test_record_size_matches_serialized_len() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut record = SessionRecord::new("s1", &CacheConfig::default(), now);
        record.history.push(ConversationEntry::new(
            "billing",
            "customer asked about refunds",
            Importance::High,
            now,
        ));

        record.refresh_size();

        let expected = serde_json::to_vec(&record).unwrap().len();
        assert_eq!(record.size_bytes(), expected);
        assert_eq!(record_size(&record), expected);
    }

    #[test]
    fn test_size_settles_across_digit_boundary() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut record = SessionRecord::new("s1", &CacheConfig::default(), now);
        record.context.memory_usage.total_size_bytes = 7;
        record.history.push(ConversationEntry::new(
            "t",
            "w".repeat(2_000),
            Importance::Medium,
            now,
        ));

        let settled = record_size(&record);
        record.context.memory_usage.total_size_bytes = settled;

        assert_eq!(serde_json::to_vec(&record).unwrap().len(), settled);
    }

    #[test]
    fn test_digits() {
        assert_eq!(digits(0), 1);
        assert_eq!(digits(9), 1);
        assert_eq!(digits(10), 2);
        assert_eq!(digits(999), 3);
        assert_eq!(digits(1000), 4);
    }

    #[test]
    fn test_record_size_grows_with_history() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut record = SessionRecord::new("s1", &CacheConfig::default(), now);
        let before = record_size(&record);

        record
            .history
            .push(ConversationEntry::new("t", "x".repeat(100), Importance::Low, now));

        assert!(record_size(&record) > before + 100);
    }
}
