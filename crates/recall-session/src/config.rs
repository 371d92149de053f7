//! Configuration for the context cache.

use std::time::Duration;

use chrono::TimeDelta;

use crate::error::{Error, Result};
use crate::prune::TrimMode;

/// Default age after which an untouched session is considered expired.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default hard cap on aggregate session memory (100 MiB).
pub const DEFAULT_MAX_TOTAL_MEMORY_BYTES: usize = 100 * 1024 * 1024;

/// Default reference size of a single session used by the size score (1 MiB).
pub const DEFAULT_MAX_SESSION_SIZE_BYTES: usize = 1024 * 1024;

/// Default bound on conversation history entries per session.
pub const DEFAULT_MAX_HISTORY_ENTRIES: usize = 20;

/// History bound applied by aggressive trims.
pub const DEFAULT_AGGRESSIVE_HISTORY_ENTRIES: usize = 10;

/// Default ratio of the hard cap that triggers a pruning pass.
pub const DEFAULT_TRIGGER_RATIO: f64 = 0.8;

/// Gap between the trigger ratio and the ratio a pruning pass aims for.
pub const TARGET_RATIO_GAP: f64 = 0.1;

/// Default bound on `recent_actions` labels kept in preferences.
pub const DEFAULT_MAX_RECENT_ACTIONS: usize = 10;

/// Default number of history entries included by `render_context`.
pub const DEFAULT_RENDER_HISTORY_LIMIT: usize = 5;

/// Default preferred model for new sessions.
pub const DEFAULT_PREFERRED_MODEL: &str = "auto";

/// Integrations enabled on a freshly created session.
pub const DEFAULT_INTEGRATIONS: &[&str] = &["stripe", "gmail", "telegram"];

/// Configuration for the context cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Sessions not updated within this duration are expired.
    pub max_age: Duration,

    /// Hard cap on the sum of all session sizes, in bytes.
    pub max_total_memory_bytes: usize,

    /// Per-session size reference; sessions above it score zero on size and
    /// get an aggressive trim after an append.
    pub max_session_size_bytes: usize,

    /// Maximum history entries kept per session.
    pub max_history_entries: usize,

    /// Maximum history entries kept after an aggressive trim.
    pub aggressive_history_entries: usize,

    /// Pruning starts when `aggregate / max_total_memory_bytes` exceeds this.
    pub trigger_ratio: f64,

    /// Maximum recent action labels kept by `record_action`.
    pub max_recent_actions: usize,

    /// Number of trailing history entries rendered into the context digest.
    pub render_history_limit: usize,

    /// Preferred model assigned to new sessions.
    pub default_preferred_model: String,

    /// Integrations enabled on new sessions.
    pub default_integrations: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            max_total_memory_bytes: DEFAULT_MAX_TOTAL_MEMORY_BYTES,
            max_session_size_bytes: DEFAULT_MAX_SESSION_SIZE_BYTES,
            max_history_entries: DEFAULT_MAX_HISTORY_ENTRIES,
            aggressive_history_entries: DEFAULT_AGGRESSIVE_HISTORY_ENTRIES,
            trigger_ratio: DEFAULT_TRIGGER_RATIO,
            max_recent_actions: DEFAULT_MAX_RECENT_ACTIONS,
            render_history_limit: DEFAULT_RENDER_HISTORY_LIMIT,
            default_preferred_model: DEFAULT_PREFERRED_MODEL.to_string(),
            default_integrations: DEFAULT_INTEGRATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session expiry age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the aggregate memory hard cap.
    pub fn with_max_total_memory(mut self, bytes: usize) -> Self {
        self.max_total_memory_bytes = bytes;
        self
    }

    /// Set the per-session size reference.
    pub fn with_max_session_size(mut self, bytes: usize) -> Self {
        self.max_session_size_bytes = bytes;
        self
    }

    /// Set the normal and aggressive history bounds.
    pub fn with_history_limits(mut self, normal: usize, aggressive: usize) -> Self {
        self.max_history_entries = normal;
        self.aggressive_history_entries = aggressive;
        self
    }

    /// Set the pruning trigger ratio.
    pub fn with_trigger_ratio(mut self, ratio: f64) -> Self {
        self.trigger_ratio = ratio;
        self
    }

    /// Set the bound on recent action labels.
    pub fn with_max_recent_actions(mut self, max: usize) -> Self {
        self.max_recent_actions = max;
        self
    }

    /// Set how many history entries `render_context` includes.
    pub fn with_render_history_limit(mut self, limit: usize) -> Self {
        self.render_history_limit = limit;
        self
    }

    /// Set the preferred model for new sessions.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_preferred_model = model.into();
        self
    }

    /// Set the integrations enabled on new sessions.
    pub fn with_default_integrations<I, S>(mut self, integrations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_integrations = integrations.into_iter().map(Into::into).collect();
        self
    }

    /// History bound for a trim mode.
    pub fn history_limit(&self, mode: TrimMode) -> usize {
        match mode {
            TrimMode::Normal => self.max_history_entries,
            TrimMode::Aggressive => self.aggressive_history_entries,
        }
    }

    /// Ratio of the hard cap a pruning pass tries to get under.
    pub fn target_ratio(&self) -> f64 {
        self.trigger_ratio - TARGET_RATIO_GAP
    }

    /// Aggregate size a pruning pass tries to get under, in bytes.
    pub fn target_bytes(&self) -> f64 {
        self.max_total_memory_bytes as f64 * self.target_ratio()
    }

    /// Expiry age as a chrono delta, saturating for out-of-range durations.
    pub(crate) fn max_age_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.max_age).unwrap_or(TimeDelta::MAX)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_total_memory_bytes == 0 {
            return Err(Error::invalid("max_total_memory_bytes", "must be non-zero"));
        }
        if self.max_session_size_bytes == 0 {
            return Err(Error::invalid("max_session_size_bytes", "must be non-zero"));
        }
        if self.max_history_entries == 0 {
            return Err(Error::invalid("max_history_entries", "must be non-zero"));
        }
        if self.aggressive_history_entries > self.max_history_entries {
            return Err(Error::invalid(
                "aggressive_history_entries",
                format!(
                    "({}) must not exceed max_history_entries ({})",
                    self.aggressive_history_entries, self.max_history_entries
                ),
            ));
        }
        if !(self.trigger_ratio > TARGET_RATIO_GAP && self.trigger_ratio <= 1.0) {
            return Err(Error::invalid(
                "trigger_ratio",
                format!("({}) must be in (0.1, 1.0]", self.trigger_ratio),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_history_entries, 20);
        assert_eq!(config.aggressive_history_entries, 10);
        assert_eq!(config.max_age, Duration::from_secs(86_400));
        assert!((config.target_ratio() - 0.7).abs() < 1e-12);
        assert_eq!(config.history_limit(TrimMode::Normal), 20);
        assert_eq!(config.history_limit(TrimMode::Aggressive), 10);
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = CacheConfig::new()
            .with_max_total_memory(1000)
            .with_trigger_ratio(0.5)
            .with_default_integrations(["slack"]);

        assert_eq!(config.max_total_memory_bytes, 1000);
        assert!((config.target_bytes() - 400.0).abs() < 1e-9);
        assert_eq!(config.default_integrations, vec!["slack".to_string()]);
    }

    #[test]
    fn test_rejects_zero_cap() {
        let config = CacheConfig::new().with_max_total_memory(0);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig {
                field: "max_total_memory_bytes",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_inverted_history_limits() {
        let config = CacheConfig::new().with_history_limits(5, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_trigger_ratio_out_of_range() {
        assert!(CacheConfig::new().with_trigger_ratio(0.05).validate().is_err());
        assert!(CacheConfig::new().with_trigger_ratio(1.5).validate().is_err());
        assert!(CacheConfig::new().with_trigger_ratio(1.0).validate().is_ok());
    }

    #[test]
    fn test_huge_max_age_saturates() {
        let config = CacheConfig::new().with_max_age(Duration::MAX);
        assert_eq!(config.max_age_delta(), TimeDelta::MAX);
    }
}
