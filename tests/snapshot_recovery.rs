//! Snapshot recovery tests
//!
//! Exercises the restore path end to end: snapshot round-trips, the
//! divergence prompts when disk content changed or disappeared behind
//! a snapshot, and what each answer does to the stored pair.

mod common;

use common::*;
use seshat_core::{JobOutcome, PromptChoice, PromptKind};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[tokio::test]
async fn test_restore_round_trip_after_flush() {
    let dir = TempDir::new().unwrap();
    let doc_a = seed_document(&dir, "a.md", "alpha\n").await;
    let doc_b = seed_document(&dir, "b.md", "beta\n").await;
    let mut coordinator = local_coordinator(&dir);

    coordinator.open(doc_a.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;
    coordinator
        .edit(|shell| shell.buffer.insert("edited "))
        .await
        .unwrap();

    // Switching away flushes the edits to disk and the snapshot pair
    coordinator.open(doc_b.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    // Coming back restores from the snapshot without prompting, since
    // the flushed disk content still matches the recorded hash
    let seen = Arc::new(Mutex::new(Vec::new()));
    coordinator.open(doc_a.clone()).await;
    let finished = coordinator
        .drive_until_idle(scripted_prompts(
            PromptChoice::Declined,
            Arc::clone(&seen),
        ))
        .await;

    assert!(seen.lock().unwrap().is_empty());
    assert!(matches!(
        finished.last().unwrap().outcome,
        JobOutcome::Opened { restored: true, .. }
    ));
    coordinator
        .with_editor(|shell| {
            assert_eq!(shell.buffer.text(), "edited alpha\n");
            assert!(shell.buffer.can_undo());
        })
        .await;
    assert!(coordinator.flags().snapshot().can_undo);
}

#[tokio::test]
async fn test_decline_reload_keeps_snapshot_buffer() {
    let dir = TempDir::new().unwrap();
    let doc = seed_document(&dir, "a.md", "original\n").await;
    let (mut coordinator, ops) = recording_coordinator(&dir);

    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;
    coordinator
        .edit(|shell| shell.buffer.insert("mine "))
        .await
        .unwrap();
    coordinator.save().await.unwrap();
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    // Another writer replaces the file behind the session's back
    tokio::fs::write(dir.path().join("a.md"), "external change\n")
        .await
        .unwrap();

    let before = recorded_ops(&ops).len();
    let seen = Arc::new(Mutex::new(Vec::new()));
    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(scripted_prompts(
            PromptChoice::Declined,
            Arc::clone(&seen),
        ))
        .await;

    assert_eq!(&*seen.lock().unwrap(), &[PromptKind::ReloadChangedFile]);
    coordinator
        .with_editor(|shell| assert_eq!(shell.buffer.text(), "mine original\n"))
        .await;

    // Declining kept us on the snapshot: the hash was compared but the
    // live content was never read
    let tail = recorded_ops(&ops).split_off(before);
    assert!(tail.iter().any(|op| op == "hash a.md"), "{:?}", tail);
    assert!(!tail.iter().any(|op| op == "read a.md"), "{:?}", tail);
}

#[tokio::test]
async fn test_confirm_reload_reads_live_content() {
    let dir = TempDir::new().unwrap();
    let doc = seed_document(&dir, "a.md", "original\n").await;
    let (mut coordinator, ops) = recording_coordinator(&dir);

    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;
    coordinator
        .edit(|shell| shell.buffer.insert("mine "))
        .await
        .unwrap();
    coordinator.save().await.unwrap();
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    tokio::fs::write(dir.path().join("a.md"), "external change\n")
        .await
        .unwrap();

    let before = recorded_ops(&ops).len();
    let seen = Arc::new(Mutex::new(Vec::new()));
    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(scripted_prompts(
            PromptChoice::Confirmed,
            Arc::clone(&seen),
        ))
        .await;

    assert_eq!(&*seen.lock().unwrap(), &[PromptKind::ReloadChangedFile]);
    coordinator
        .with_editor(|shell| assert_eq!(shell.buffer.text(), "external change\n"))
        .await;

    let tail = recorded_ops(&ops).split_off(before);
    assert!(tail.iter().any(|op| op == "read a.md"), "{:?}", tail);
}

#[tokio::test]
async fn test_discard_deleted_removes_snapshot() {
    let dir = TempDir::new().unwrap();
    let doc = seed_document(&dir, "gone.md", "content\n").await;
    let mut coordinator = local_coordinator(&dir);

    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;
    coordinator
        .edit(|shell| shell.buffer.insert("kept "))
        .await
        .unwrap();
    coordinator.save().await.unwrap();
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    tokio::fs::remove_file(dir.path().join("gone.md"))
        .await
        .unwrap();

    // Declining the keep-prompt discards the stored pair
    let seen = Arc::new(Mutex::new(Vec::new()));
    coordinator.open(doc.clone()).await;
    let finished = coordinator
        .drive_until_idle(scripted_prompts(
            PromptChoice::Declined,
            Arc::clone(&seen),
        ))
        .await;

    assert_eq!(&*seen.lock().unwrap(), &[PromptKind::KeepDeletedFile]);
    assert!(matches!(
        finished.last().unwrap().outcome,
        JobOutcome::Opened { restored: true, .. }
    ));
    assert!(!coordinator.snapshots().exists(&doc.uri).await);
    coordinator
        .with_editor(|shell| assert_eq!(shell.buffer.text(), "kept content\n"))
        .await;

    // With the snapshot gone and the file missing, reopening can only fail
    coordinator.open(doc.clone()).await;
    let finished = coordinator
        .drive_until_idle(scripted_prompts(
            PromptChoice::Declined,
            Arc::clone(&seen),
        ))
        .await;
    assert!(matches!(
        finished.last().unwrap().outcome,
        JobOutcome::Failed { .. }
    ));
    assert_eq!(seen.lock().unwrap().len(), 1, "no second prompt");
}

#[tokio::test]
async fn test_keep_deleted_preserves_snapshot() {
    let dir = TempDir::new().unwrap();
    let doc = seed_document(&dir, "gone.md", "content\n").await;
    let mut coordinator = local_coordinator(&dir);

    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;
    coordinator
        .edit(|shell| shell.buffer.insert("kept "))
        .await
        .unwrap();
    coordinator.save().await.unwrap();
    coordinator
        .drive_until_idle(|_| PromptChoice::Declined)
        .await;

    tokio::fs::remove_file(dir.path().join("gone.md"))
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    coordinator.open(doc.clone()).await;
    coordinator
        .drive_until_idle(scripted_prompts(
            PromptChoice::Confirmed,
            Arc::clone(&seen),
        ))
        .await;

    assert_eq!(&*seen.lock().unwrap(), &[PromptKind::KeepDeletedFile]);
    assert!(coordinator.snapshots().exists(&doc.uri).await);
    coordinator
        .with_editor(|shell| assert_eq!(shell.buffer.text(), "kept content\n"))
        .await;
}
