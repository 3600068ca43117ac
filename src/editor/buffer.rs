//! Text buffer with rope data structure
//!
//! Efficient text storage and manipulation using ropey. The buffer knows
//! nothing about storage; the coordinator loads and flushes it through the
//! storage provider, and the snapshot store persists its edit history.

use ropey::Rope;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Edit operation for undo/redo
///
/// Positions are char indices into the rope. A replace edit carries both
/// the inserted and the deleted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Position where the edit occurred
    pub position: usize,

    /// Text that was inserted (empty if deletion)
    pub inserted: String,

    /// Text that was deleted (empty if insertion)
    pub deleted: String,
}

/// Text buffer with undo/redo support
pub struct TextBuffer {
    /// Text content (rope for efficient editing)
    content: Rope,

    /// Whether the buffer has edits not yet flushed to storage
    dirty: bool,

    /// Cursor position as a char index
    cursor: usize,

    /// Undo stack
    undo_stack: VecDeque<Edit>,

    /// Redo stack
    redo_stack: VecDeque<Edit>,
}

impl TextBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            content: Rope::new(),
            dirty: false,
            cursor: 0,
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
        }
    }

    /// Create a buffer holding `text`, clean and with empty history
    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.load_text(text);
        buffer
    }

    /// Replace the whole content, resetting history and the dirty flag.
    /// Used when restoring a snapshot or re-reading the live file.
    pub fn load_text(&mut self, text: &str) {
        self.content = Rope::from_str(text);
        self.dirty = false;
        self.cursor = 0;
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Insert text at the cursor
    pub fn insert(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let pos = self.cursor.min(self.content.len_chars());

        self.undo_stack.push_back(Edit {
            position: pos,
            inserted: text.to_string(),
            deleted: String::new(),
        });
        self.redo_stack.clear();

        self.content.insert(pos, text);
        self.dirty = true;
        self.cursor = pos + text.chars().count();
    }

    /// Delete a char range
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.content.len_chars());
        if start >= end {
            return;
        }
        let deleted: String = self.content.slice(start..end).to_string();

        self.undo_stack.push_back(Edit {
            position: start,
            inserted: String::new(),
            deleted,
        });
        self.redo_stack.clear();

        self.content.remove(start..end);
        self.dirty = true;
        self.cursor = start;
    }

    /// Replace a char range with new text, recorded as a single edit
    pub fn replace_range(&mut self, start: usize, end: usize, replacement: &str) {
        let end = end.min(self.content.len_chars());
        if start > end {
            return;
        }
        let deleted: String = self.content.slice(start..end).to_string();

        self.undo_stack.push_back(Edit {
            position: start,
            inserted: replacement.to_string(),
            deleted,
        });
        self.redo_stack.clear();

        self.content.remove(start..end);
        self.content.insert(start, replacement);
        self.dirty = true;
        self.cursor = start + replacement.chars().count();
    }

    /// Undo the last edit
    pub fn undo(&mut self) -> Option<Edit> {
        let edit = self.undo_stack.pop_back()?;

        // Reverse the edit: take out what it inserted, put back what it deleted
        if !edit.inserted.is_empty() {
            let inserted_chars = edit.inserted.chars().count();
            self.content
                .remove(edit.position..edit.position + inserted_chars);
        }
        if !edit.deleted.is_empty() {
            self.content.insert(edit.position, &edit.deleted);
        }

        self.redo_stack.push_back(edit.clone());
        self.dirty = true;

        Some(edit)
    }

    /// Redo the last undone edit
    pub fn redo(&mut self) -> Option<Edit> {
        let edit = self.redo_stack.pop_back()?;

        // Replay the edit
        if !edit.deleted.is_empty() {
            let deleted_chars = edit.deleted.chars().count();
            self.content
                .remove(edit.position..edit.position + deleted_chars);
        }
        if !edit.inserted.is_empty() {
            self.content.insert(edit.position, &edit.inserted);
        }

        self.undo_stack.push_back(edit.clone());
        self.dirty = true;

        Some(edit)
    }

    /// Whether an undo step is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether a redo step is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clone out both history stacks for snapshot serialization
    pub fn history(&self) -> (Vec<Edit>, Vec<Edit>) {
        (
            self.undo_stack.iter().cloned().collect(),
            self.redo_stack.iter().cloned().collect(),
        )
    }

    /// Restore history stacks from a snapshot
    pub fn restore_history(&mut self, undo: Vec<Edit>, redo: Vec<Edit>) {
        self.undo_stack = undo.into();
        self.redo_stack = redo.into();
    }

    /// Whether the buffer has unsaved edits
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful flush
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Cursor position as a char index
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped to the content length
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.content.len_chars());
    }

    /// Get text content as a string
    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// Content length in chars
    pub fn len_chars(&self) -> usize {
        self.content.len_chars()
    }

    /// Get line count
    pub fn line_count(&self) -> usize {
        self.content.len_lines()
    }

    /// Get line by index
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx >= self.content.len_lines() {
            return None;
        }
        Some(self.content.line(idx).to_string())
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_dirty() {
        let mut buffer = TextBuffer::new();
        assert!(!buffer.is_dirty());

        buffer.insert("Hello");
        buffer.insert(", world!");

        assert_eq!(buffer.text(), "Hello, world!");
        assert!(buffer.is_dirty());
        assert_eq!(buffer.cursor(), 13);
    }

    #[test]
    fn test_undo_redo() {
        let mut buffer = TextBuffer::new();

        buffer.insert("Hello");
        buffer.insert(" World");
        assert_eq!(buffer.text(), "Hello World");

        buffer.undo();
        assert_eq!(buffer.text(), "Hello");

        buffer.redo();
        assert_eq!(buffer.text(), "Hello World");
    }

    #[test]
    fn test_replace_range_round_trips_through_undo() {
        let mut buffer = TextBuffer::from_text("one two three");

        buffer.replace_range(4, 7, "2");
        assert_eq!(buffer.text(), "one 2 three");

        buffer.undo();
        assert_eq!(buffer.text(), "one two three");

        buffer.redo();
        assert_eq!(buffer.text(), "one 2 three");
    }

    #[test]
    fn test_multibyte_edits() {
        let mut buffer = TextBuffer::from_text("naïve café");

        buffer.delete_range(0, 5);
        assert_eq!(buffer.text(), " café");

        buffer.undo();
        assert_eq!(buffer.text(), "naïve café");
    }

    #[test]
    fn test_load_text_resets_history() {
        let mut buffer = TextBuffer::new();
        buffer.insert("scratch");
        assert!(buffer.can_undo());

        buffer.load_text("fresh contents");
        assert!(!buffer.can_undo());
        assert!(!buffer.can_redo());
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn test_history_export_restore() {
        let mut buffer = TextBuffer::new();
        buffer.insert("abc");
        buffer.insert("def");
        buffer.undo();

        let (undo, redo) = buffer.history();
        assert_eq!(undo.len(), 1);
        assert_eq!(redo.len(), 1);

        let mut restored = TextBuffer::from_text(&buffer.text());
        restored.restore_history(undo, redo);
        assert!(restored.can_undo());
        assert!(restored.can_redo());

        restored.undo();
        assert_eq!(restored.text(), "");
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut buffer = TextBuffer::new();
        buffer.insert("first");
        buffer.undo();
        assert!(buffer.can_redo());

        buffer.insert("second");
        assert!(!buffer.can_redo());
    }
}
