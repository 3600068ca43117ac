//! The live editing surface for the active document
//!
//! Composes the rope buffer, the syntax engine and the search state. The
//! coordinator owns one shell behind an async lock; session jobs restore
//! and flush it, the host edits it between jobs.

mod buffer;
mod search;
mod syntax;

pub use buffer::{Edit, TextBuffer};
pub use search::{MatchMode, SearchSpec, SearchState};
pub use syntax::{HighlightKind, HighlightSpan, Language, SyntaxEngine};

use std::path::Path;

use crate::error::Result;

/// Buffer, syntax and search state for the single active document
pub struct EditorShell {
    /// Text buffer
    pub buffer: TextBuffer,

    /// Syntax engine
    pub syntax: SyntaxEngine,

    /// Search results and history
    pub search: SearchState,
}

impl EditorShell {
    /// Create an empty shell
    pub fn new() -> Self {
        Self {
            buffer: TextBuffer::new(),
            syntax: SyntaxEngine::new(),
            search: SearchState::new(),
        }
    }

    /// Start a document transition: the match list and the parse tree
    /// belong to the outgoing document and are dropped now.
    pub fn begin_transition(&mut self) {
        self.search.clear();
        self.syntax.reset();
    }

    /// Replace the buffer with `text` and initialize syntax for `name`
    pub fn load_document(&mut self, name: &str, text: &str) -> Result<()> {
        self.buffer.load_text(text);
        let language = Language::from_path(Path::new(name)).unwrap_or(Language::PlainText);
        self.syntax.initialize(language, text)
    }

    /// Evaluate a search query against the current buffer
    pub fn run_search(&mut self, spec: &SearchSpec) -> usize {
        let text = self.buffer.text();
        self.search.evaluate(spec, &text)
    }

    /// Replace the current match in the buffer
    pub fn replace_current(&mut self, replacement: &str) -> bool {
        self.search.replace_current(&mut self.buffer, replacement)
    }

    /// Replace all matches in the buffer
    pub fn replace_all(&mut self, replacement: &str) -> usize {
        self.search.replace_all(&mut self.buffer, replacement)
    }
}

impl Default for EditorShell {
    fn default() -> Self {
        Self::new()
    }
}
