//! Seshat - Per-Document Editing Session Coordinator
//!
//! A Rust library for coordinating document editing sessions that provides:
//! - Supersede-on-open job control per document URI
//! - Crash recovery through paired state and text snapshots
//! - Divergence detection between snapshots and live files
//! - Debounced regex search with match navigation and replace
//! - Tree-sitter syntax analysis for common text formats
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (DocumentUri, ContentHash, JobOutcome)
//! - **Storage**: Document providers (local filesystem, test doubles)
//! - **Editor**: Rope buffer, syntax engine and search state
//! - **Session**: Job registry, editing flags and the coordinator
//!
//! # Example
//!
//! ```ignore
//! use seshat_core::{DocumentRef, DocumentUri, PromptChoice, SessionCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = seshat_core::config::SeshatConfig::resolve(None)?;
//!     let mut coordinator = SessionCoordinator::with_local_storage(config);
//!
//!     // Open a document; recovery and divergence prompts arrive as events
//!     let uri = DocumentUri::from_path(std::path::Path::new("notes.md"));
//!     coordinator.open(DocumentRef::new(uri)).await;
//!     coordinator.drive_until_idle(|_| PromptChoice::Confirmed).await;
//!
//!     // Edit and save
//!     coordinator.edit(|shell| shell.buffer.insert("# Notes\n")).await?;
//!     coordinator.save().await?;
//!     coordinator.drive_until_idle(|_| PromptChoice::Confirmed).await;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod hash;
pub mod prefs;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::SeshatConfig;
pub use document::DocumentRef;
pub use error::{Result, SeshatError};
pub use session::{
    EditingFlags, FlagSnapshot, JobFinished, PromptChoice, PromptKind, PromptRequest,
    SessionCoordinator, SessionEvent,
};
pub use storage::{LocalFileStorage, StorageProvider};
pub use types::{ContentHash, DocumentUri, JobKind, JobOutcome};
