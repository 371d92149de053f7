//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [cache]      # context cache limits and defaults
//! [sweeper]    # background expiry sweep
//! [logging]    # console filter and rolling JSON log files
//! ```

use std::path::PathBuf;
use std::time::Duration;

use recall_session::CacheConfig;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// Context cache configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSection>,

    /// Expiry sweeper configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweeper: Option<SweeperSection>,

    /// Logging configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSection>,
}

impl RecallConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with every section populated with defaults.
    ///
    /// Used as the template written by `recall config init`.
    pub fn with_defaults() -> Self {
        Self {
            cache: Some(CacheSection::default()),
            sweeper: Some(SweeperSection::default()),
            logging: Some(LoggingSection::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole; a layer that sets one `[cache]` key
    /// gets defaults for the rest of that section.
    pub fn merge(&mut self, other: RecallConfig) {
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.sweeper.is_some() {
            self.sweeper = other.sweeper;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Resolved `[cache]` section, falling back to defaults.
    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    /// Resolved `[sweeper]` section, falling back to defaults.
    pub fn sweeper(&self) -> SweeperSection {
        self.sweeper.clone().unwrap_or_default()
    }

    /// Resolved `[logging]` section, falling back to defaults.
    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Context cache configuration.
///
/// ```toml
/// [cache]
/// max_age_secs = 86400
/// max_total_memory_bytes = 104857600
/// max_session_size_bytes = 1048576
/// max_history_entries = 20
/// aggressive_history_entries = 10
/// trigger_ratio = 0.8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Seconds without an update before a session expires.
    pub max_age_secs: u64,
    /// Hard cap on aggregate session memory in bytes.
    pub max_total_memory_bytes: usize,
    /// Per-session size reference in bytes.
    pub max_session_size_bytes: usize,
    /// History entries kept per session.
    pub max_history_entries: usize,
    /// History entries kept after an aggressive trim.
    pub aggressive_history_entries: usize,
    /// Fraction of the hard cap that triggers a pruning pass.
    pub trigger_ratio: f64,
    /// Recent action labels kept per session.
    pub max_recent_actions: usize,
    /// History entries included in a rendered digest.
    pub render_history_limit: usize,
    /// Preferred model for new sessions.
    pub default_preferred_model: String,
    /// Integrations enabled on new sessions.
    pub default_integrations: Vec<String>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheSection {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_age_secs: config.max_age.as_secs(),
            max_total_memory_bytes: config.max_total_memory_bytes,
            max_session_size_bytes: config.max_session_size_bytes,
            max_history_entries: config.max_history_entries,
            aggressive_history_entries: config.aggressive_history_entries,
            trigger_ratio: config.trigger_ratio,
            max_recent_actions: config.max_recent_actions,
            render_history_limit: config.render_history_limit,
            default_preferred_model: config.default_preferred_model.clone(),
            default_integrations: config.default_integrations.clone(),
        }
    }
}

impl CacheSection {
    /// Build a validated cache configuration from this section.
    pub fn to_cache_config(&self) -> recall_session::Result<CacheConfig> {
        let config = CacheConfig::new()
            .with_max_age(Duration::from_secs(self.max_age_secs))
            .with_max_total_memory(self.max_total_memory_bytes)
            .with_max_session_size(self.max_session_size_bytes)
            .with_history_limits(self.max_history_entries, self.aggressive_history_entries)
            .with_trigger_ratio(self.trigger_ratio)
            .with_max_recent_actions(self.max_recent_actions)
            .with_render_history_limit(self.render_history_limit)
            .with_default_model(self.default_preferred_model.clone())
            .with_default_integrations(self.default_integrations.iter().cloned());
        config.validate()?;
        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sweeper
// ─────────────────────────────────────────────────────────────────────────────

/// Background expiry sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperSection {
    /// Whether long-running commands start a sweeper.
    pub enabled: bool,
    /// Seconds between sweeps.
    pub interval_secs: u64,
}

impl Default for SweeperSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: recall_session::DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl SweeperSection {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Console and file logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive for the console; overrides the built-in default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Write JSON logs to daily rolling files.
    pub file: bool,
    /// Directory for log files. Defaults to `logs/` under the config dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}
