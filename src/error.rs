//! Error types for the Seshat session coordinator
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for Seshat operations
#[derive(Error, Debug)]
pub enum SeshatError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Document does not exist in storage
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Storage refused access to the document
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Document URI could not be resolved to a storage path
    #[error("Invalid document URI: {0}")]
    InvalidUri(String),

    /// Preference store serialization error
    #[error("Preference error: {0}")]
    Preference(#[from] serde_json::Error),

    /// Editor state blob could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot pair is missing or inconsistent
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Search pattern failed to compile
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    /// Operation was cancelled cooperatively
    #[error("Operation cancelled")]
    Cancelled,

    /// Editor is in the busy posture and refuses edits
    #[error("Editor is busy")]
    Busy,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl SeshatError {
    /// Whether this error represents cooperative cancellation rather than
    /// a failure. Cancellation never surfaces as a user-visible fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SeshatError::Cancelled)
    }
}

/// Result type alias for Seshat operations
pub type Result<T> = std::result::Result<T, SeshatError>;

/// Convert anyhow::Error to SeshatError
impl From<anyhow::Error> for SeshatError {
    fn from(err: anyhow::Error) -> Self {
        SeshatError::Other(err.to_string())
    }
}
