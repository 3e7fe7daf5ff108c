//! Structural content blocks.
//!
//! A chapter is a flat sequence of [`Block`]s in document order. Each block
//! pairs a [`BlockKind`] (what it is) with a precomputed size (what it costs
//! against a page's budget). Blocks are produced once by the scan stage and
//! are read-only afterwards: the pager places them into pages, and only ever
//! creates new blocks when it slices an oversized paragraph.
//!
//! ## JSON Shape
//!
//! Blocks serialize flat, with the kind as a `type` tag and the size beside it:
//!
//! ```json
//! { "type": "heading", "level": 2, "text": "Office Hours", "size": 2 }
//! { "type": "paragraph", "content": [{ "type": "text", "content": "..." }], "size": 87 }
//! { "type": "hr", "size": 0 }
//! ```

use crate::measure::SizeMeasurer;
use serde::{Deserialize, Serialize};

/// A run of inline content with a single style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Span {
    Text { content: String },
    Strong { content: String },
    #[serde(rename = "em")]
    Emphasis { content: String },
    Code { content: String },
    Link { content: String, url: String },
    /// Raw inline markup, emitted without escaping.
    Html { content: String },
}

impl Span {
    pub fn text(content: impl Into<String>) -> Self {
        Span::Text {
            content: content.into(),
        }
    }

    /// The span's raw content (markup included for [`Span::Html`]).
    pub fn content(&self) -> &str {
        match self {
            Span::Text { content }
            | Span::Strong { content }
            | Span::Emphasis { content }
            | Span::Code { content }
            | Span::Link { content, .. }
            | Span::Html { content } => content,
        }
    }

    /// True when both spans render with the same style (same link target for links).
    pub fn same_style(&self, other: &Span) -> bool {
        match (self, other) {
            (Span::Link { url: a, .. }, Span::Link { url: b, .. }) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// A span with this span's style and different content.
    pub fn restyle(&self, content: String) -> Span {
        match self {
            Span::Text { .. } => Span::Text { content },
            Span::Strong { .. } => Span::Strong { content },
            Span::Emphasis { .. } => Span::Emphasis { content },
            Span::Code { .. } => Span::Code { content },
            Span::Link { url, .. } => Span::Link {
                content,
                url: url.clone(),
            },
            Span::Html { .. } => Span::Html { content },
        }
    }

    fn push_str(&mut self, s: &str) {
        match self {
            Span::Text { content }
            | Span::Strong { content }
            | Span::Emphasis { content }
            | Span::Code { content }
            | Span::Link { content, .. }
            | Span::Html { content } => content.push_str(s),
        }
    }
}

/// Append a span, merging it into the last one when the styles match.
pub fn push_span(spans: &mut Vec<Span>, span: Span) {
    match spans.last_mut() {
        Some(last) if last.same_style(&span) => last.push_str(span.content()),
        _ => spans.push(span),
    }
}

/// Concatenated raw content of a span sequence.
pub fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(Span::content).collect()
}

/// What a block is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        content: Vec<Span>,
    },
    Blockquote {
        content: Vec<Span>,
    },
    List {
        ordered: bool,
        items: Vec<Vec<Span>>,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        text: String,
    },
    /// A standalone inline fragment (for example a raw HTML block).
    #[serde(rename = "inline")]
    InlineContent {
        content: Vec<Span>,
    },
    #[serde(rename = "hr")]
    Rule,
}

impl BlockKind {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        BlockKind::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        BlockKind::Paragraph {
            content: vec![Span::text(text)],
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, BlockKind::Heading { .. })
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, BlockKind::Paragraph { .. })
    }

    /// Short lowercase name used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Heading { .. } => "heading",
            BlockKind::Paragraph { .. } => "paragraph",
            BlockKind::Blockquote { .. } => "blockquote",
            BlockKind::List { .. } => "list",
            BlockKind::Code { .. } => "code",
            BlockKind::InlineContent { .. } => "inline",
            BlockKind::Rule => "rule",
        }
    }

    /// The block's text content, without markup added by rendering.
    ///
    /// List items are separated by newlines. A rule has no text.
    pub fn plain_text(&self) -> String {
        match self {
            BlockKind::Heading { text, .. } | BlockKind::Code { text, .. } => text.clone(),
            BlockKind::Paragraph { content }
            | BlockKind::Blockquote { content }
            | BlockKind::InlineContent { content } => spans_text(content),
            BlockKind::List { items, .. } => items
                .iter()
                .map(|item| spans_text(item))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockKind::Rule => String::new(),
        }
    }

    /// True for a non-rule block with nothing but whitespace in it.
    pub fn is_blank(&self) -> bool {
        !matches!(self, BlockKind::Rule) && self.plain_text().trim().is_empty()
    }
}

/// A structural unit of content with its cost in the page budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    kind: BlockKind,
    size: usize,
}

impl Block {
    /// A block with a precomputed size.
    pub fn new(kind: BlockKind, size: usize) -> Self {
        Self { kind, size }
    }

    /// A block sized by `measurer`.
    pub fn measured(kind: BlockKind, measurer: &dyn SizeMeasurer) -> Self {
        let size = measurer.measure(&kind);
        Self { kind, size }
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn into_kind(self) -> BlockKind {
        self.kind
    }

    pub fn is_blank(&self) -> bool {
        self.kind.is_blank()
    }

    /// Check the preconditions the pager relies on.
    ///
    /// Returns the reason the block is malformed, if it is.
    pub fn check(&self) -> Result<(), String> {
        if let BlockKind::Heading { level, .. } = self.kind
            && !(1..=6).contains(&level)
        {
            return Err(format!("heading level {level} is outside 1..=6"));
        }
        if self.size == 0 && !matches!(self.kind, BlockKind::Rule) {
            return Err(format!("{} has zero size", self.kind.name()));
        }
        Ok(())
    }
}
