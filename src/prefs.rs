//! Preference store for session continuity
//!
//! Holds the "last active document" key and the recent-documents list in a
//! JSON file. Writes are synchronous and durable: the coordinator commits
//! the last-active key before spawning any document I/O, so a crash during
//! a load still restores the right document on the next launch.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use crate::error::Result;
use crate::types::DocumentUri;

/// Persisted preference payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Prefs {
    /// The document to restore on next launch
    last_active_document: Option<DocumentUri>,

    /// Most recently opened documents, newest first
    #[serde(default)]
    recent_documents: Vec<DocumentUri>,
}

/// File-backed preference store
pub struct PrefStore {
    path: PathBuf,
    recent_cap: usize,
    prefs: Prefs,
}

impl PrefStore {
    /// Load preferences from `path`, falling back to defaults when the file
    /// is absent or unreadable. A corrupt preference file is not fatal.
    pub fn load(path: PathBuf, recent_cap: usize) -> Self {
        let prefs = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(prefs) => prefs,
                Err(e) => {
                    warn!("Discarding corrupt preference file {:?}: {}", path, e);
                    Prefs::default()
                }
            },
            Err(_) => Prefs::default(),
        };
        Self {
            path,
            recent_cap,
            prefs,
        }
    }

    /// The document that was active when the process last ran
    pub fn last_active(&self) -> Option<&DocumentUri> {
        self.prefs.last_active_document.as_ref()
    }

    /// Recently opened documents, newest first
    pub fn recent(&self) -> &[DocumentUri] {
        &self.prefs.recent_documents
    }

    /// Record `uri` as the active document and commit synchronously.
    ///
    /// Called before any open I/O is spawned so the key survives a crash
    /// mid-transition.
    pub fn set_last_active(&mut self, uri: &DocumentUri) -> Result<()> {
        self.prefs.last_active_document = Some(uri.clone());
        self.prefs.recent_documents.retain(|u| u != uri);
        self.prefs.recent_documents.insert(0, uri.clone());
        self.prefs.recent_documents.truncate(self.recent_cap);
        self.commit()
    }

    /// Drop the active-document key, keeping the recent list
    pub fn clear_last_active(&mut self) -> Result<()> {
        self.prefs.last_active_document = None;
        self.commit()
    }

    /// Durable write: temp file, fsync, rename over the old file
    fn commit(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(&self.prefs)?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(payload.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
