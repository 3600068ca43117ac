//! Syntax engine initialization and highlighting
//!
//! Wraps tree-sitter parser setup for the supported grammars. The
//! coordinator resets the engine when a document transition starts and
//! initializes it against the loaded buffer once text is available.

use std::path::Path;
use tree_sitter::{Parser, Tree};

use crate::error::{Result, SeshatError};

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Markdown,
    Rust,
    Python,
    JSON,
    TOML,
    YAML,
    PlainText,
}

impl Language {
    /// Detect language from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "md" | "markdown" => Some(Language::Markdown),
            "rs" => Some(Language::Rust),
            "py" => Some(Language::Python),
            "json" => Some(Language::JSON),
            "toml" => Some(Language::TOML),
            "yaml" | "yml" => Some(Language::YAML),
            _ => None,
        }
    }

    /// Get file extension for language
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Markdown => "md",
            Language::Rust => "rs",
            Language::Python => "py",
            Language::JSON => "json",
            Language::TOML => "toml",
            Language::YAML => "yaml",
            Language::PlainText => "txt",
        }
    }

    /// The tree-sitter grammar for this language, if one is bundled
    fn grammar(&self) -> Option<tree_sitter::Language> {
        match self {
            Language::Markdown => Some(tree_sitter_md::LANGUAGE.into()),
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::JSON => Some(tree_sitter_json::LANGUAGE.into()),
            Language::TOML => Some(tree_sitter_toml_ng::LANGUAGE.into()),
            Language::YAML => Some(tree_sitter_yaml::LANGUAGE.into()),
            Language::PlainText => None,
        }
    }
}

/// Highlight kinds shared across grammars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    Heading,
    Emphasis,
    Strong,
    CodeInline,
    CodeBlock,
    Link,
    Comment,
    String,
    Number,
}

/// Highlight span in byte offsets
#[derive(Debug, Clone)]
pub struct HighlightSpan {
    /// Start byte offset
    pub start: usize,

    /// End byte offset
    pub end: usize,

    /// Highlight kind
    pub kind: HighlightKind,
}

/// Tree-sitter parser wrapper holding the current parse tree
pub struct SyntaxEngine {
    parser: Parser,
    language: Language,
    tree: Option<Tree>,
}

impl SyntaxEngine {
    /// Create an engine with no grammar loaded
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            language: Language::PlainText,
            tree: None,
        }
    }

    /// Current language
    pub fn language(&self) -> Language {
        self.language
    }

    /// Whether a parse tree is held for the current document
    pub fn is_initialized(&self) -> bool {
        self.tree.is_some()
    }

    /// Configure the grammar and parse `text`, retaining the tree
    pub fn initialize(&mut self, language: Language, text: &str) -> Result<()> {
        self.language = language;
        self.tree = None;

        let Some(grammar) = language.grammar() else {
            return Ok(());
        };
        self.parser
            .set_language(&grammar)
            .map_err(|e| SeshatError::Other(format!("failed to load grammar: {}", e)))?;
        self.tree = self.parser.parse(text, None);
        Ok(())
    }

    /// Drop the tree and return to plain text.
    /// Called when a document transition starts.
    pub fn reset(&mut self) {
        self.language = Language::PlainText;
        self.tree = None;
        self.parser.reset();
    }

    /// Highlight spans from the retained tree
    pub fn highlight(&self, text: &str) -> Vec<HighlightSpan> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };

        let mut spans = Vec::new();
        walk_node(tree.root_node(), text, &mut spans);
        spans.sort_by_key(|s| s.start);
        spans
    }
}

impl Default for SyntaxEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk syntax tree node and extract highlights
fn walk_node(node: tree_sitter::Node, text: &str, spans: &mut Vec<HighlightSpan>) {
    let highlight_kind = match node.kind() {
        "atx_heading" | "setext_heading" => Some(HighlightKind::Heading),
        "emphasis" => Some(HighlightKind::Emphasis),
        "strong_emphasis" => Some(HighlightKind::Strong),
        "code_span" => Some(HighlightKind::CodeInline),
        "fenced_code_block" | "indented_code_block" => Some(HighlightKind::CodeBlock),
        "link" | "autolink" | "inline_link" => Some(HighlightKind::Link),
        "comment" | "line_comment" | "block_comment" => Some(HighlightKind::Comment),
        "string" | "string_literal" | "raw_string_literal" | "string_content" => {
            Some(HighlightKind::String)
        }
        "number" | "integer" | "float" | "integer_literal" | "float_literal" => {
            Some(HighlightKind::Number)
        }
        _ => None,
    };

    if let Some(kind) = highlight_kind {
        spans.push(HighlightSpan {
            start: node.start_byte(),
            end: node.end_byte(),
            kind,
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_node(child, text, spans);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(
            Language::from_path(Path::new("notes.md")),
            Some(Language::Markdown)
        );
        assert_eq!(
            Language::from_path(Path::new("src/lib.rs")),
            Some(Language::Rust)
        );
        assert_eq!(Language::from_path(Path::new("data.bin")), None);
    }

    #[test]
    fn test_markdown_initialize_and_highlight() {
        let mut engine = SyntaxEngine::new();
        let text = "# Title\n\nSome *emphasis* and `code`\n";
        engine.initialize(Language::Markdown, text).unwrap();

        assert!(engine.is_initialized());
        let spans = engine.highlight(text);
        assert!(spans.iter().any(|s| s.kind == HighlightKind::Heading));
    }

    #[test]
    fn test_json_highlight() {
        let mut engine = SyntaxEngine::new();
        let text = "{\"count\": 3}";
        engine.initialize(Language::JSON, text).unwrap();

        let spans = engine.highlight(text);
        assert!(spans.iter().any(|s| s.kind == HighlightKind::String));
        assert!(spans.iter().any(|s| s.kind == HighlightKind::Number));
    }

    #[test]
    fn test_plain_text_has_no_tree() {
        let mut engine = SyntaxEngine::new();
        engine.initialize(Language::PlainText, "anything").unwrap();
        assert!(!engine.is_initialized());
        assert!(engine.highlight("anything").is_empty());
    }

    #[test]
    fn test_reset_drops_tree() {
        let mut engine = SyntaxEngine::new();
        engine.initialize(Language::Markdown, "# A").unwrap();
        assert!(engine.is_initialized());

        engine.reset();
        assert!(!engine.is_initialized());
        assert_eq!(engine.language(), Language::PlainText);
    }
}
