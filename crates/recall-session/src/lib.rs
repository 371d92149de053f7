//! Conversation context cache with priority-scored pruning.
//!
//! This crate provides a process-wide store of per-session conversation
//! context with:
//! - Lazy session creation and age-based expiry
//! - Bounded, importance-weighted conversation history
//! - A memory budget enforced by trimming history in place and evicting the
//!   lowest-priority sessions
//! - An optional background sweeper for expired sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use recall_session::{CacheConfig, ContextCache, ContextPatch, Importance};
//!
//! let cache = ContextCache::new(CacheConfig::default())?;
//!
//! cache.get_or_create(&session_id);
//! cache.update(&session_id, ContextPatch::new().workflow("refunds"));
//! cache.append_entry(&session_id, "refunds", "asked about order 1234", Importance::High);
//! let digest = cache.render_context(&session_id);
//! ```

mod cache;
mod clock;
mod config;
mod error;
mod model;
pub mod priority;
pub mod prune;
mod render;
pub mod size;
mod sweeper;

pub use cache::{CacheStats, ContextCache, SessionPriority};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use model::{
    ContextPatch, ConversationEntry, Importance, MemoryUsage, PreferencesPatch, ProjectState,
    ProjectStatePatch, SessionContext, SessionRecord, UserPreferences,
};
pub use prune::{PruneReport, TrimMode};
pub use render::render_record;
pub use sweeper::{DEFAULT_SWEEP_INTERVAL, ExpirySweeper};
