//! Common test utilities and helpers

use async_trait::async_trait;
use seshat_core::document::display_name;
use seshat_core::{
    ContentHash, DocumentRef, DocumentUri, LocalFileStorage, PromptChoice, PromptKind,
    PromptRequest, Result, SeshatConfig, SessionCoordinator, StorageProvider,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Session configuration rooted in a fresh temp directory
pub fn test_config(dir: &TempDir) -> SeshatConfig {
    SeshatConfig {
        data_dir: dir.path().join("data"),
        ..SeshatConfig::default()
    }
}

/// Coordinator over the local filesystem, storing session data under `dir`
pub fn local_coordinator(dir: &TempDir) -> SessionCoordinator {
    SessionCoordinator::with_local_storage(test_config(dir))
}

/// Coordinator whose storage operations are recorded for order assertions
pub fn recording_coordinator(dir: &TempDir) -> (SessionCoordinator, OpLog) {
    let (storage, log) = RecordingStorage::new();
    let coordinator = SessionCoordinator::new(test_config(dir), storage);
    (coordinator, log)
}

/// Write a document into the test directory and return its reference
pub async fn seed_document(dir: &TempDir, name: &str, content: &str) -> DocumentRef {
    let path = dir.path().join(name);
    tokio::fs::write(&path, content)
        .await
        .expect("Failed to seed document");
    DocumentRef::new(DocumentUri::from_path(&path))
}

/// Reference a document path without creating the file
pub fn document_ref(dir: &TempDir, name: &str) -> DocumentRef {
    DocumentRef::new(DocumentUri::from_path(&dir.path().join(name)))
}

/// Prompt policy that answers every prompt with `choice` and records the
/// kinds seen, in order
pub fn scripted_prompts(
    choice: PromptChoice,
    seen: Arc<Mutex<Vec<PromptKind>>>,
) -> impl FnMut(&PromptRequest) -> PromptChoice {
    move |request| {
        seen.lock().expect("prompt log poisoned").push(request.kind);
        choice
    }
}

/// Shared operation log filled in by `RecordingStorage`
pub type OpLog = Arc<Mutex<Vec<String>>>;

/// Snapshot of the operations recorded so far, as "op name" strings
pub fn recorded_ops(log: &OpLog) -> Vec<String> {
    log.lock().expect("op log poisoned").clone()
}

/// Storage decorator that records the order of document operations
pub struct RecordingStorage {
    inner: LocalFileStorage,
    log: OpLog,
}

impl RecordingStorage {
    pub fn new() -> (Arc<Self>, OpLog) {
        let log: OpLog = Arc::new(Mutex::new(Vec::new()));
        let storage = Arc::new(Self {
            inner: LocalFileStorage::new(),
            log: Arc::clone(&log),
        });
        (storage, log)
    }

    fn record(&self, op: &str, uri: &DocumentUri) {
        self.log
            .lock()
            .expect("op log poisoned")
            .push(format!("{} {}", op, display_name(uri)));
    }
}

#[async_trait]
impl StorageProvider for RecordingStorage {
    async fn resolve(&self, uri: &DocumentUri) -> Result<DocumentRef> {
        self.record("resolve", uri);
        self.inner.resolve(uri).await
    }

    async fn read_to_string(&self, uri: &DocumentUri) -> Result<String> {
        self.record("read", uri);
        self.inner.read_to_string(uri).await
    }

    async fn read_bytes(&self, uri: &DocumentUri) -> Result<Vec<u8>> {
        self.record("read_bytes", uri);
        self.inner.read_bytes(uri).await
    }

    async fn write(&self, uri: &DocumentUri, contents: &str) -> Result<()> {
        self.record("write", uri);
        self.inner.write(uri, contents).await
    }

    async fn exists(&self, uri: &DocumentUri) -> Result<bool> {
        self.record("exists", uri);
        self.inner.exists(uri).await
    }

    async fn content_hash(&self, uri: &DocumentUri) -> Result<Option<ContentHash>> {
        self.record("hash", uri);
        self.inner.content_hash(uri).await
    }
}
