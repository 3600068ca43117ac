//! Session lifecycle tests
//!
//! Covers job supersession, the flush-before-load ordering, save
//! persistence and the memory pressure path, all through the public
//! coordinator interface.

mod common;

use common::*;
use seshat_core::{hash, JobKind, JobOutcome, PromptChoice};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[tokio::test]
async fn test_open_supersedes_inflight_job() {
    let dir = TempDir::new().unwrap();
    let doc_a = seed_document(&dir, "a.md", "alpha\n").await;
    let doc_b = seed_document(&dir, "b.md", "beta\n").await;
    let mut coordinator = local_coordinator(&dir);

    // The second open lands before the first job has run at all
    coordinator.open(doc_a.clone()).await;
    coordinator.open(doc_b.clone()).await;
    assert_eq!(coordinator.inflight(), 2);

    let finished = coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    assert_eq!(finished.len(), 2);
    assert_eq!(finished[0].uri, doc_a.uri);
    assert_eq!(finished[0].outcome, JobOutcome::Cancelled);
    assert_eq!(finished[1].uri, doc_b.uri);
    assert!(matches!(finished[1].outcome, JobOutcome::Opened { .. }));

    // Only the winner's effects applied
    let flags = coordinator.flags().snapshot();
    assert!(!flags.busy);
    assert!(!flags.text_changed);
    coordinator
        .with_editor(|shell| assert_eq!(shell.buffer.text(), "beta\n"))
        .await;
    assert!(coordinator.registry().is_empty());
    assert_eq!(coordinator.active().map(|d| d.uri.clone()), Some(doc_b.uri));
}

#[tokio::test]
async fn test_flush_previous_before_loading_next() {
    let dir = TempDir::new().unwrap();
    let doc_a = seed_document(&dir, "a.md", "alpha\n").await;
    let doc_b = seed_document(&dir, "b.md", "beta\n").await;
    let (mut coordinator, ops) = recording_coordinator(&dir);

    coordinator.open(doc_a.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    coordinator
        .edit(|shell| shell.buffer.insert("edited "))
        .await
        .unwrap();
    assert!(coordinator.flags().snapshot().text_changed);

    let seen = Arc::new(Mutex::new(Vec::new()));
    coordinator.open(doc_b.clone()).await;
    let finished = coordinator
        .drive_until_idle(scripted_prompts(
            PromptChoice::Declined,
            Arc::clone(&seen),
        ))
        .await;
    assert!(matches!(finished[0].outcome, JobOutcome::Opened { .. }));
    assert!(seen.lock().unwrap().is_empty(), "clean open must not prompt");

    // The completed predecessor's edits hit storage before the new
    // document was read
    let ops = recorded_ops(&ops);
    let write_a = ops.iter().position(|op| op == "write a.md").unwrap();
    let read_b = ops.iter().position(|op| op == "read b.md").unwrap();
    assert!(write_a < read_b, "flush must precede load: {:?}", ops);

    // Flush refreshed both disk and the snapshot pair
    let on_disk = tokio::fs::read_to_string(dir.path().join("a.md"))
        .await
        .unwrap();
    assert_eq!(on_disk, "edited alpha\n");
    assert!(coordinator.snapshots().exists(&doc_a.uri).await);
    assert_eq!(
        coordinator.recent_documents(),
        vec![doc_b.uri.clone(), doc_a.uri.clone()]
    );
}

#[tokio::test]
async fn test_superseded_flush_window_loses_edits() {
    let dir = TempDir::new().unwrap();
    let doc_a = seed_document(&dir, "a.md", "alpha\n").await;
    let doc_b = seed_document(&dir, "b.md", "beta\n").await;
    let doc_c = seed_document(&dir, "c.md", "gamma\n").await;
    let mut coordinator = local_coordinator(&dir);

    coordinator.open(doc_a.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;
    coordinator
        .edit(|shell| shell.buffer.insert("edited "))
        .await
        .unwrap();

    // b's job would flush a's edits, but c supersedes it before it runs
    coordinator.open(doc_b.clone()).await;
    coordinator.open(doc_c.clone()).await;
    let finished = coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    assert_eq!(finished[0].uri, doc_b.uri);
    assert_eq!(finished[0].outcome, JobOutcome::Cancelled);
    assert!(matches!(finished[1].outcome, JobOutcome::Opened { .. }));

    // The unsaved edits never reached disk or the snapshot store
    let on_disk = tokio::fs::read_to_string(dir.path().join("a.md"))
        .await
        .unwrap();
    assert_eq!(on_disk, "alpha\n");
    assert!(!coordinator.snapshots().exists(&doc_a.uri).await);
    coordinator
        .with_editor(|shell| assert_eq!(shell.buffer.text(), "gamma\n"))
        .await;
}

#[tokio::test]
async fn test_save_persists_buffer_and_snapshots() {
    let dir = TempDir::new().unwrap();
    let doc = seed_document(&dir, "notes.md", "# notes\n").await;
    let mut coordinator = local_coordinator(&dir);

    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;
    coordinator
        .edit(|shell| shell.buffer.insert("## new\n"))
        .await
        .unwrap();

    coordinator.save().await.unwrap();
    assert!(coordinator.flags().snapshot().busy);
    assert_eq!(
        coordinator.registry().registered_kind(&doc.uri),
        Some(JobKind::Save)
    );

    let finished = coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome, JobOutcome::Saved);

    // Disk, snapshots and flags have all settled once the report arrives
    let on_disk = tokio::fs::read_to_string(dir.path().join("notes.md"))
        .await
        .unwrap();
    assert_eq!(on_disk, "## new\n# notes\n");
    assert!(coordinator.snapshots().exists(&doc.uri).await);

    let state = coordinator
        .snapshots()
        .read_state(&doc.uri)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        state.content_hash,
        Some(hash::hash_str("## new\n# notes\n"))
    );
    assert!(state.can_undo());

    let flags = coordinator.flags().snapshot();
    assert!(!flags.busy);
    assert!(!flags.text_changed);
    coordinator
        .with_editor(|shell| assert!(!shell.buffer.is_dirty()))
        .await;
}

#[tokio::test]
async fn test_memory_pressure_flush() {
    let dir = TempDir::new().unwrap();
    let doc = seed_document(&dir, "draft.md", "start\n").await;
    let mut coordinator = local_coordinator(&dir);

    // Nothing active: nothing to flush
    assert!(coordinator.on_memory_pressure().is_none());

    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    // Active but clean: still nothing to flush
    assert!(coordinator.on_memory_pressure().is_none());

    coordinator
        .edit(|shell| shell.buffer.insert("more "))
        .await
        .unwrap();
    let handle = coordinator
        .on_memory_pressure()
        .expect("dirty buffer should flush");
    handle.await.unwrap();

    let on_disk = tokio::fs::read_to_string(dir.path().join("draft.md"))
        .await
        .unwrap();
    assert_eq!(on_disk, "more start\n");
    assert!(coordinator.snapshots().exists(&doc.uri).await);

    // Fire-and-forget: no job registered, no events, flags untouched
    assert_eq!(coordinator.inflight(), 0);
    assert!(coordinator.registry().is_empty());
    assert!(coordinator.flags().snapshot().text_changed);
}

#[tokio::test]
async fn test_last_active_survives_restart() {
    let dir = TempDir::new().unwrap();
    let doc = seed_document(&dir, "keep.md", "x\n").await;

    {
        let mut coordinator = local_coordinator(&dir);
        coordinator.open(doc.clone()).await;
        coordinator
            .drive_until_idle(|_| PromptChoice::Declined)
            .await;
    }

    // A fresh coordinator over the same data dir sees the session prefs
    let coordinator = local_coordinator(&dir);
    assert_eq!(coordinator.last_active(), Some(doc.uri.clone()));
    assert_eq!(coordinator.recent_documents(), vec![doc.uri]);
}
