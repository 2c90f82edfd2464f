//! Error types for cloud field generation

use thiserror::Error;

/// Main error type for the generator
#[derive(Debug, Error)]
pub enum Error {
    /// Unresolvable kernel binding, invalid noise selector, degenerate bounds
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Layer capacity exceeded (max {capacity} layers)")]
    CapacityExceeded { capacity: usize },

    #[error("Invalid state transition: {trigger} while {from}")]
    InvalidTransition {
        from: &'static str,
        trigger: &'static str,
    },

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] with a formatted message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
