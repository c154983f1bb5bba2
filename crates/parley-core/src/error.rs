//! Error types for Parley.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every Parley crate.
///
/// Core failures (`InvalidSession`, `Storage`, `Serialization`) are kept
/// apart from dispatcher-level failures (`Inference`, `Timeout`,
/// `InvalidInput`) so callers can tell a broken session from a broken
/// model call.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParleyError {
    /// Session identifier missing or blank
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Persistence read/write failed (the StorageFailure category)
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The inference service failed or returned an unusable payload
    #[error("Inference error: {0}")]
    Inference(String),

    /// The inference call exceeded its deadline
    #[error("Inference timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Malformed request reaching the dispatcher
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an InvalidSession error
    pub fn invalid_session(message: impl Into<String>) -> Self {
        Self::InvalidSession(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates an Inference error
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an InvalidSession error
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, Self::InvalidSession(_))
    }

    /// Check if the persistence layer produced this error.
    ///
    /// Undecodable records count as storage failures: the caller cannot act
    /// on them any differently from a failed read.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Serialization { .. })
    }

    /// Check if this is an inference failure (including timeouts)
    pub fn is_inference_failure(&self) -> bool {
        matches!(self, Self::Inference(_) | Self::Timeout { .. })
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ParleyError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ParleyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ParleyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ParleyError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (for adapters that still speak anyhow)
impl From<anyhow::Error> for ParleyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ParleyError>`.
pub type Result<T> = std::result::Result<T, ParleyError>;
