//! Observable editing-state flags
//!
//! Four watch channels describing the active document: can-undo, can-redo,
//! text-changed and busy. The coordinator is the only writer; hosts
//! subscribe receivers to drive affordances. Flags always describe the
//! currently active document and reset when another one becomes active.

use tokio::sync::watch;

/// Point-in-time view of all four flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagSnapshot {
    /// An undo step is available
    pub can_undo: bool,

    /// A redo step is available
    pub can_redo: bool,

    /// The buffer has edits not yet flushed to storage
    pub text_changed: bool,

    /// A session job is running; the editor is read-only
    pub busy: bool,
}

/// Watch-channel backed flag set
#[derive(Debug)]
pub struct EditingFlags {
    can_undo: watch::Sender<bool>,
    can_redo: watch::Sender<bool>,
    text_changed: watch::Sender<bool>,
    busy: watch::Sender<bool>,
}

impl EditingFlags {
    /// All flags start false
    pub fn new() -> Self {
        Self {
            can_undo: watch::channel(false).0,
            can_redo: watch::channel(false).0,
            text_changed: watch::channel(false).0,
            busy: watch::channel(false).0,
        }
    }

    /// Current values of all flags
    pub fn snapshot(&self) -> FlagSnapshot {
        FlagSnapshot {
            can_undo: *self.can_undo.borrow(),
            can_redo: *self.can_redo.borrow(),
            text_changed: *self.text_changed.borrow(),
            busy: *self.busy.borrow(),
        }
    }

    /// Enter or leave the busy/read-only posture
    pub fn set_busy(&self, value: bool) {
        self.busy.send_replace(value);
    }

    /// Mark whether the buffer holds unflushed edits
    pub fn set_text_changed(&self, value: bool) {
        self.text_changed.send_replace(value);
    }

    /// Update undo/redo availability together
    pub fn set_editing(&self, can_undo: bool, can_redo: bool) {
        self.can_undo.send_replace(can_undo);
        self.can_redo.send_replace(can_redo);
    }

    /// Reset everything to false for a newly active document
    pub fn reset(&self) {
        self.can_undo.send_replace(false);
        self.can_redo.send_replace(false);
        self.text_changed.send_replace(false);
        self.busy.send_replace(false);
    }

    /// Subscribe to busy transitions
    pub fn watch_busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    /// Subscribe to text-changed transitions
    pub fn watch_text_changed(&self) -> watch::Receiver<bool> {
        self.text_changed.subscribe()
    }

    /// Subscribe to can-undo transitions
    pub fn watch_can_undo(&self) -> watch::Receiver<bool> {
        self.can_undo.subscribe()
    }

    /// Subscribe to can-redo transitions
    pub fn watch_can_redo(&self) -> watch::Receiver<bool> {
        self.can_redo.subscribe()
    }
}

impl Default for EditingFlags {
    fn default() -> Self {
        Self::new()
    }
}
