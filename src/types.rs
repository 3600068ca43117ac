//! Core data types for the Seshat session coordinator
//!
//! This module defines the fundamental data structures used throughout seshat,
//! including document URIs, content hashes, and session job vocabulary. These
//! types form the foundation of the per-document session protocol.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SeshatError};

/// Persistent identifier for a document
///
/// Wraps an opaque URI string to provide type safety and prevent mixing
/// document identifiers with display names or raw paths. Supports `file://`
/// URIs and bare filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUri(String);

impl DocumentUri {
    /// Create a URI from an already-formed identifier string
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Create a `file://` URI from a filesystem path
    pub fn from_path(path: &Path) -> Self {
        Self(format!("file://{}", path.display()))
    }

    /// Resolve the URI to a local filesystem path
    ///
    /// Accepts both `file://` URIs and bare paths. Empty URIs and
    /// non-file schemes are rejected.
    pub fn to_path(&self) -> Result<PathBuf> {
        if self.0.is_empty() {
            return Err(SeshatError::InvalidUri("empty URI".to_string()));
        }
        if let Some(stripped) = self.0.strip_prefix("file://") {
            if stripped.is_empty() {
                return Err(SeshatError::InvalidUri(self.0.clone()));
            }
            return Ok(PathBuf::from(stripped));
        }
        if self.0.contains("://") {
            return Err(SeshatError::InvalidUri(self.0.clone()));
        }
        Ok(PathBuf::from(&self.0))
    }

    /// The raw URI string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 digest of a document's live bytes
///
/// Compared against the hash stored in the last snapshot to detect
/// modification or deletion that happened outside the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Hex rendering of the full digest
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First eight hex characters, for log lines
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// What a registered session job is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Flush the previous document, then load a new one
    Open,

    /// Write the active document and refresh its snapshot
    Save,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Open => write!(f, "open"),
            JobKind::Save => write!(f, "save"),
        }
    }
}

/// Terminal state of a session job, delivered with the job-finished event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// An open job ran to completion
    Opened {
        /// Whether a snapshot pair was found and applied
        restored: bool,

        /// Undo availability carried over from the snapshot
        can_undo: bool,

        /// Redo availability carried over from the snapshot
        can_redo: bool,
    },

    /// A save job ran to completion
    Saved,

    /// The job observed its cancellation token and unwound early
    Cancelled,

    /// The job hit a storage or serialization fault
    Failed {
        /// Human-readable error text
        message: String,
    },
}

impl JobOutcome {
    /// Whether completion effects should be applied for this outcome.
    /// Cancelled jobs never touch editing flags.
    pub fn applies_effects(&self) -> bool {
        !matches!(self, JobOutcome::Cancelled)
    }
}
