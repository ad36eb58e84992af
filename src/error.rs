//! Centralized error types for the warmer

use thiserror::Error;

/// Warmer error types
#[derive(Debug, Error)]
pub enum WarmerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sibling invocation was rejected by the invoker
    #[error("Invocation {index} of '{function}' failed: {message}")]
    Invoke {
        function: String,
        index: u32,
        message: String,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, WarmerError>;
