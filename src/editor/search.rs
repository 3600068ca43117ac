//! Search and replace over the active buffer
//!
//! Queries are evaluated against the buffer text into a sorted list of
//! match ranges. Navigation binary-searches that list relative to the
//! current match, so a stale marker (after a replace edit) still lands on
//! the nearest surviving match. Pattern syntax errors are suppressed: the
//! previous results stay on screen and nothing crashes mid-keystroke.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::buffer::TextBuffer;

/// How the query text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Query is a regular expression
    Regex,

    /// Query is a literal matched at word boundaries
    Word,
}

/// A search request flowing through the debounced channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    /// Query text
    pub text: String,

    /// Interpretation mode
    pub mode: MatchMode,

    /// Case-insensitive matching
    pub ignore_case: bool,
}

impl SearchSpec {
    /// Regex-mode query with default options
    pub fn regex(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Regex,
            ignore_case: false,
        }
    }

    /// Word-mode query with default options
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Word,
            ignore_case: false,
        }
    }
}

/// Match list, current-match marker and query history
#[derive(Debug, Default)]
pub struct SearchState {
    /// Sorted char ranges of all matches
    results: Vec<(usize, usize)>,

    /// Current match marker; may point at a range no longer in the list
    current: Option<(usize, usize)>,

    /// Previously evaluated queries, oldest first
    search_history: Vec<String>,

    /// Previously applied replacements, oldest first
    replace_history: Vec<String>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate a query against `text`, replacing the match list.
    ///
    /// Returns the match count. An empty query clears the list; an invalid
    /// pattern leaves the previous results untouched. Multiline anchoring
    /// turns on automatically when the query itself spans lines.
    pub fn evaluate(&mut self, spec: &SearchSpec, text: &str) -> usize {
        if spec.text.is_empty() {
            self.results.clear();
            self.current = None;
            return 0;
        }

        let pattern = match spec.mode {
            MatchMode::Regex => spec.text.clone(),
            MatchMode::Word => format!(r"\b{}\b", regex::escape(&spec.text)),
        };
        let multiline = spec.text.contains('\n') || spec.text.contains('\r');

        let regex = match RegexBuilder::new(&pattern)
            .case_insensitive(spec.ignore_case)
            .multi_line(multiline)
            .build()
        {
            Ok(re) => re,
            Err(e) => {
                debug!("Suppressing invalid search pattern: {}", e);
                return self.results.len();
            }
        };

        let byte_ranges: Vec<(usize, usize)> =
            regex.find_iter(text).map(|m| (m.start(), m.end())).collect();
        self.results = to_char_ranges(text, &byte_ranges);

        if !self.search_history.contains(&spec.text) {
            self.search_history.push(spec.text.clone());
        }
        self.results.len()
    }

    /// Drop results and the current marker, keeping query history.
    /// Called when a document transition starts.
    pub fn clear(&mut self) {
        self.results.clear();
        self.current = None;
    }

    /// Sorted char ranges of the current match list
    pub fn results(&self) -> &[(usize, usize)] {
        &self.results
    }

    /// The current match marker
    pub fn current(&self) -> Option<(usize, usize)> {
        self.current
    }

    /// Advance to the next match, wrapping past the end.
    /// Returns the new index into the match list.
    pub fn next(&mut self) -> Option<usize> {
        if self.results.is_empty() {
            return None;
        }
        let last = self.results.len() - 1;
        let idx = match self.lookup_current() {
            Ok(i) => {
                if i + 1 > last {
                    0
                } else {
                    i + 1
                }
            }
            Err(ins) => {
                if ins > last {
                    0
                } else {
                    ins
                }
            }
        };
        self.current = Some(self.results[idx]);
        Some(idx)
    }

    /// Step to the previous match, wrapping past the start.
    /// Returns the new index into the match list.
    pub fn prev(&mut self) -> Option<usize> {
        if self.results.is_empty() {
            return None;
        }
        let last = self.results.len() - 1;
        let idx = match self.lookup_current() {
            Ok(i) => {
                if i == 0 {
                    last
                } else {
                    i - 1
                }
            }
            Err(ins) => {
                if ins == 0 {
                    last
                } else {
                    ins - 1
                }
            }
        };
        self.current = Some(self.results[idx]);
        Some(idx)
    }

    /// Replace the current match and remove it from the list, shifting the
    /// ranges behind it by the length delta. The marker keeps pointing at
    /// the replaced position so navigation continues from there.
    pub fn replace_current(&mut self, buffer: &mut TextBuffer, replacement: &str) -> bool {
        let Some(cur) = self.current else {
            return false;
        };
        let Ok(idx) = self.results.binary_search(&cur) else {
            return false;
        };

        self.results.remove(idx);
        let (start, end) = cur;
        buffer.replace_range(start, end, replacement);

        let delta = replacement.chars().count() as isize - (end - start) as isize;
        for range in &mut self.results[idx..] {
            range.0 = (range.0 as isize + delta) as usize;
            range.1 = (range.1 as isize + delta) as usize;
        }

        if !replacement.is_empty() && !self.replace_history.contains(&replacement.to_string()) {
            self.replace_history.push(replacement.to_string());
        }
        true
    }

    /// Replace every match, clearing the list and the marker.
    /// Returns the number of replacements applied.
    pub fn replace_all(&mut self, buffer: &mut TextBuffer, replacement: &str) -> usize {
        if self.results.is_empty() {
            return 0;
        }
        let count = self.results.len();

        // Apply back to front so earlier ranges stay valid
        for (start, end) in self.results.iter().rev() {
            buffer.replace_range(*start, *end, replacement);
        }
        self.results.clear();
        self.current = None;

        if !replacement.is_empty() && !self.replace_history.contains(&replacement.to_string()) {
            self.replace_history.push(replacement.to_string());
        }
        count
    }

    /// Queries evaluated so far, oldest first
    pub fn search_history(&self) -> &[String] {
        &self.search_history
    }

    /// Replacement texts applied so far, oldest first
    pub fn replace_history(&self) -> &[String] {
        &self.replace_history
    }

    /// Binary-search the match list for the current marker. A missing
    /// marker behaves like an insertion point at the front.
    fn lookup_current(&self) -> std::result::Result<usize, usize> {
        match self.current {
            Some(cur) => self.results.binary_search(&cur),
            None => Err(0),
        }
    }
}

/// Translate sorted byte ranges into char ranges in one pass
fn to_char_ranges(text: &str, byte_ranges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    if byte_ranges.is_empty() {
        return Vec::new();
    }
    let boundaries: Vec<usize> = byte_ranges.iter().flat_map(|&(s, e)| [s, e]).collect();
    let mut translated = Vec::with_capacity(boundaries.len());

    let mut bi = 0;
    let mut char_idx = 0;
    for (byte_idx, _) in text.char_indices() {
        while bi < boundaries.len() && boundaries[bi] == byte_idx {
            translated.push(char_idx);
            bi += 1;
        }
        char_idx += 1;
    }
    while bi < boundaries.len() {
        translated.push(char_idx);
        bi += 1;
    }

    translated.chunks(2).map(|pair| (pair[0], pair[1])).collect()
}
