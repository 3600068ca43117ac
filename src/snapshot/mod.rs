//! Snapshot persistence
//!
//! Each document gets a pair of blobs under the snapshot directory, named
//! by the SHA-256 of its URI: `<digest>.state` (bincode editor state) and
//! `<digest>.text` (raw UTF-8 buffer). A snapshot exists iff its state
//! blob exists. Writes go through a temp file and rename, so a torn write
//! is never read back as a valid snapshot.

mod state;

pub use state::EditorState;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::Result;
use crate::hash::uri_digest;
use crate::types::DocumentUri;

/// State blob extension
const STATE_EXT: &str = "state";

/// Text blob extension
const TEXT_EXT: &str = "text";

/// Listing entry for one snapshot pair
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// URI digest the pair is filed under
    pub digest: String,

    /// Size of the state blob in bytes
    pub state_size: u64,

    /// Size of the text blob in bytes, when present
    pub text_size: Option<u64>,

    /// Last-modified time of the state blob
    pub modified: Option<DateTime<Utc>>,
}

/// File-per-document snapshot storage
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The snapshot directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn state_path(&self, uri: &DocumentUri) -> PathBuf {
        self.dir.join(format!("{}.{}", uri_digest(uri), STATE_EXT))
    }

    fn text_path(&self, uri: &DocumentUri) -> PathBuf {
        self.dir.join(format!("{}.{}", uri_digest(uri), TEXT_EXT))
    }

    /// Whether a snapshot pair exists for this document
    pub async fn exists(&self, uri: &DocumentUri) -> bool {
        tokio::fs::try_exists(self.state_path(uri))
            .await
            .unwrap_or(false)
    }

    /// Persist the state blob
    pub async fn write_state(&self, uri: &DocumentUri, state: &EditorState) -> Result<()> {
        let bytes = state.encode()?;
        self.write_blob(&self.state_path(uri), &bytes).await
    }

    /// Persist the text blob
    pub async fn write_text(&self, uri: &DocumentUri, text: &str) -> Result<()> {
        self.write_blob(&self.text_path(uri), text.as_bytes()).await
    }

    /// Read the state blob
    ///
    /// `Ok(None)` when the blob is missing or undecodable. A corrupt blob
    /// is logged and treated as absent so a load can still proceed from
    /// the live file.
    pub async fn read_state(&self, uri: &DocumentUri) -> Result<Option<EditorState>> {
        let path = self.state_path(uri);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match EditorState::decode(&bytes) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!("Discarding undecodable snapshot state {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    /// Read the text blob; `Ok(None)` when missing
    pub async fn read_text(&self, uri: &DocumentUri) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.text_path(uri)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove both blobs. Missing files are not an error.
    pub async fn delete(&self, uri: &DocumentUri) -> Result<()> {
        for path in [self.state_path(uri), self.text_path(uri)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// List all snapshot pairs in the store
    pub async fn list(&self) -> Result<Vec<SnapshotInfo>> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STATE_EXT) {
                continue;
            }
            let Some(digest) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let meta = entry.metadata().await?;
            let text_size = tokio::fs::metadata(path.with_extension(TEXT_EXT))
                .await
                .ok()
                .map(|m| m.len());
            entries.push(SnapshotInfo {
                digest: digest.to_string(),
                state_size: meta.len(),
                text_size,
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        entries.sort_by(|a, b| a.digest.cmp(&b.digest));
        Ok(entries)
    }

    /// Temp-file write with fsync, renamed into place
    async fn write_blob(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = tmp_path(path);
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
