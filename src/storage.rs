//! Storage layer for document contents
//!
//! Provides the provider abstraction the coordinator reads and writes
//! documents through, plus the local-filesystem implementation. Tests swap
//! in recording or failing providers at this seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::document::{display_name, guess_mime, DocumentRef};
use crate::error::{Result, SeshatError};
use crate::hash::{self, hash_bytes};
use crate::types::{ContentHash, DocumentUri};

/// Storage provider trait defining all document operations
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Resolve a URI to a reference with live metadata
    async fn resolve(&self, uri: &DocumentUri) -> Result<DocumentRef>;

    /// Read the full document as UTF-8 text
    async fn read_to_string(&self, uri: &DocumentUri) -> Result<String>;

    /// Read the full document as raw bytes
    async fn read_bytes(&self, uri: &DocumentUri) -> Result<Vec<u8>>;

    /// Write the document, replacing any existing contents
    async fn write(&self, uri: &DocumentUri, contents: &str) -> Result<()>;

    /// Whether the document currently exists
    async fn exists(&self, uri: &DocumentUri) -> Result<bool>;

    /// Hash the document's live bytes
    ///
    /// `Ok(None)` means the document is gone, which the load pipeline
    /// treats as deletion rather than failure.
    async fn content_hash(&self, uri: &DocumentUri) -> Result<Option<ContentHash>> {
        match self.read_bytes(uri).await {
            Ok(bytes) => Ok(Some(hash_bytes(&bytes))),
            Err(SeshatError::DocumentNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Local filesystem provider backed by tokio::fs
#[derive(Debug, Default, Clone)]
pub struct LocalFileStorage;

impl LocalFileStorage {
    pub fn new() -> Self {
        Self
    }

    fn path_of(&self, uri: &DocumentUri) -> Result<PathBuf> {
        uri.to_path()
    }
}

#[async_trait]
impl StorageProvider for LocalFileStorage {
    async fn resolve(&self, uri: &DocumentUri) -> Result<DocumentRef> {
        let path = self.path_of(uri)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io_error(uri, e))?;
        let name = display_name(uri);
        let mime = guess_mime(&name).to_string();
        Ok(DocumentRef {
            uri: uri.clone(),
            name,
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            mime,
        })
    }

    async fn read_to_string(&self, uri: &DocumentUri) -> Result<String> {
        let path = self.path_of(uri)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| map_io_error(uri, e))
    }

    async fn read_bytes(&self, uri: &DocumentUri) -> Result<Vec<u8>> {
        let path = self.path_of(uri)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| map_io_error(uri, e))
    }

    async fn write(&self, uri: &DocumentUri, contents: &str) -> Result<()> {
        let path = self.path_of(uri)?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| map_io_error(uri, e))
    }

    async fn exists(&self, uri: &DocumentUri) -> Result<bool> {
        let path = self.path_of(uri)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn content_hash(&self, uri: &DocumentUri) -> Result<Option<ContentHash>> {
        let path = self.path_of(uri)?;
        hash::hash_file(&path).await
    }
}

/// Translate I/O error kinds into document-shaped errors
fn map_io_error(uri: &DocumentUri, e: std::io::Error) -> SeshatError {
    match e.kind() {
        std::io::ErrorKind::NotFound => SeshatError::DocumentNotFound(uri.to_string()),
        std::io::ErrorKind::PermissionDenied => SeshatError::PermissionDenied(uri.to_string()),
        _ => SeshatError::Io(e),
    }
}
