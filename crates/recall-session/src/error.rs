//! Error types for context cache construction.
//!
//! Cache operations themselves never fail; only an invalid configuration
//! is rejected, and only at construction time.

/// Error type for context cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is out of its allowed range.
    #[error("Invalid cache config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

impl Error {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for context cache operations.
pub type Result<T> = std::result::Result<T, Error>;
