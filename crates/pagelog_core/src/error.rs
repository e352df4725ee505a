//! Error types for pagelog core.
//!
//! Log calls never return errors. These cover setup (configuration, level
//! parsing) and the diagnostic decode path.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in pagelog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Record codec error.
    #[error("codec error: {0}")]
    Codec(#[from] pagelog_codec::CodecError),

    /// Manager configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Which setting is wrong and why.
        message: String,
    },

    /// A level name or number could not be parsed.
    #[error("invalid level: {value}")]
    InvalidLevel {
        /// The rejected input.
        value: String,
    },
}

impl CoreError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid level error.
    pub fn invalid_level(value: impl Into<String>) -> Self {
        Self::InvalidLevel {
            value: value.into(),
        }
    }
}
