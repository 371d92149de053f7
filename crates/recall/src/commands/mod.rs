//! CLI command handlers.

pub mod config;
pub mod simulate;
pub mod soak;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use recall_config::LoadedConfig;
use recall_session::CacheConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Resolved user config directory, if one could be determined.
    pub config_dir: Option<PathBuf>,
    /// Merged configuration and the layers it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    /// Validated cache configuration from the `[cache]` section.
    pub fn cache_config(&self) -> Result<CacheConfig> {
        self.loaded
            .cache_config()
            .context("invalid [cache] configuration")
    }
}
