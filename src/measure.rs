//! Page budget measurement.
//!
//! A [`SizeMeasurer`] turns a block into its cost against a page's capacity.
//! Two policies exist because the handbook has two kinds of output that fill
//! up differently:
//!
//! - [`MarkupChars`] counts characters of the block's rendered HTML. Markup
//!   overhead (tags, attributes) is part of the cost, which keeps short
//!   list-heavy pages from looking emptier than they are.
//! - [`VisibleWords`] counts words of visible text. This is the unit the
//!   multi-column print layout is tuned for.
//!
//! [`Measure`] is the configuration value that picks one of them.

use crate::block::{BlockKind, Span};
use crate::render;
use serde::{Deserialize, Serialize};

/// Computes a block's contribution to the page budget.
pub trait SizeMeasurer: Sync {
    fn measure(&self, kind: &BlockKind) -> usize;
}

/// Characters of rendered markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupChars;

impl SizeMeasurer for MarkupChars {
    fn measure(&self, kind: &BlockKind) -> usize {
        render::render_block(kind).into_string().chars().count()
    }
}

/// Words of visible text. Every block except a rule costs at least one.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibleWords;

impl SizeMeasurer for VisibleWords {
    fn measure(&self, kind: &BlockKind) -> usize {
        match kind {
            BlockKind::Rule => 0,
            _ => count_words(&visible_text(kind)).max(1),
        }
    }
}

/// Text a reader sees: raw markup spans have their tags removed.
fn visible_text(kind: &BlockKind) -> String {
    match kind {
        BlockKind::Paragraph { content }
        | BlockKind::Blockquote { content }
        | BlockKind::InlineContent { content } => spans_visible(content),
        BlockKind::List { items, .. } => items
            .iter()
            .map(|item| spans_visible(item))
            .collect::<Vec<_>>()
            .join(" "),
        _ => kind.plain_text(),
    }
}

fn spans_visible(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Html { content } => strip_tags(content),
            other => other.content().to_string(),
        })
        .collect()
}

/// The configured measurement unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Chars,
    #[default]
    Words,
}

impl Measure {
    /// Unit label for CLI output.
    pub fn unit(&self) -> &'static str {
        match self {
            Measure::Chars => "chars",
            Measure::Words => "words",
        }
    }
}

impl SizeMeasurer for Measure {
    fn measure(&self, kind: &BlockKind) -> usize {
        match self {
            Measure::Chars => MarkupChars.measure(kind),
            Measure::Words => VisibleWords.measure(kind),
        }
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Replace markup tags with spaces so adjacent words stay separate.
pub fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}
