//! Document references and metadata
//!
//! A document reference pairs a persistent URI with metadata resolved from
//! storage at open time. References are immutable once resolved; the
//! coordinator treats them as values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DocumentUri;

/// A document URI plus the metadata known about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Persistent identifier
    pub uri: DocumentUri,

    /// Display name, typically the final path segment
    pub name: String,

    /// Size in bytes at resolution time
    pub size: u64,

    /// Last-modified timestamp, when storage reports one
    pub modified: Option<DateTime<Utc>>,

    /// MIME type guessed from the file extension
    pub mime: String,
}

impl DocumentRef {
    /// Build a reference with metadata defaults; storage providers fill in
    /// real size and timestamps via `resolve`.
    pub fn new(uri: DocumentUri) -> Self {
        let name = display_name(&uri);
        let mime = guess_mime(&name).to_string();
        Self {
            uri,
            name,
            size: 0,
            modified: None,
            mime,
        }
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Final path segment of a URI, for titles and log lines
pub fn display_name(uri: &DocumentUri) -> String {
    let raw = uri.as_str().trim_end_matches('/');
    match raw.rsplit('/').next() {
        Some(tail) if !tail.is_empty() => tail.to_string(),
        _ => raw.to_string(),
    }
}

/// MIME type from the file extension, defaulting to plain text
pub fn guess_mime(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "md" | "markdown" => "text/markdown",
        "rs" => "text/x-rust",
        "py" => "text/x-python",
        "json" => "application/json",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "txt" | "log" => "text/plain",
        _ => "text/plain",
    }
}
