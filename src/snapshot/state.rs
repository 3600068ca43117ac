//! Serialized editor state
//!
//! The state blob of a snapshot pair: edit history, selection, scroll
//! position and the content hash of the document bytes as last flushed.
//! Encoded with bincode; the coordinator never inspects the wire bytes.

use serde::{Deserialize, Serialize};

use crate::editor::{Edit, EditorShell};
use crate::error::{Result, SeshatError};
use crate::types::ContentHash;

/// Everything about an editing session that outlives the process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorState {
    /// Undo stack, oldest edit first
    pub undo_stack: Vec<Edit>,

    /// Redo stack, oldest edit first
    pub redo_stack: Vec<Edit>,

    /// Selection anchor and head as char indices
    pub selection: (usize, usize),

    /// First visible line
    pub scroll_line: usize,

    /// Hash of the document bytes when this state was captured
    pub content_hash: Option<ContentHash>,
}

impl EditorState {
    /// Capture the live shell into a persistable state
    pub fn capture(shell: &EditorShell, content_hash: Option<ContentHash>) -> Self {
        let (undo_stack, redo_stack) = shell.buffer.history();
        let cursor = shell.buffer.cursor();
        Self {
            undo_stack,
            redo_stack,
            selection: (cursor, cursor),
            scroll_line: 0,
            content_hash,
        }
    }

    /// Restore history and selection into the shell.
    /// The buffer text must already hold the snapshot's text blob.
    pub fn apply(&self, shell: &mut EditorShell) {
        shell
            .buffer
            .restore_history(self.undo_stack.clone(), self.redo_stack.clone());
        shell.buffer.set_cursor(self.selection.1);
    }

    /// Whether an undo step would be available after restore
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether a redo step would be available after restore
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Encode with bincode
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SeshatError::Serialization(e.to_string()))
    }

    /// Decode from bincode bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| SeshatError::Serialization(e.to_string()))
    }
}
