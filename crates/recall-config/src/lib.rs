//! Configuration system for Recall.
//!
//! Provides TOML-based configuration with:
//! - A `[cache]` section mapping onto [`recall_session::CacheConfig`]
//! - `[sweeper]` and `[logging]` sections for the host process
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options, save_config,
    user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
