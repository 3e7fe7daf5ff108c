//! Block → HTML markup.
//!
//! Rendering is a pure function of the block. It is used twice: by the
//! [`crate::measure::MarkupChars`] measurer (the size of a block *is* the
//! length of this markup) and by the generate stage when it lays out pages.
//! Both must agree, so there is exactly one renderer.
//!
//! All interpolated text is escaped by maud; only [`Span::Html`] content is
//! emitted verbatim.

use crate::block::{BlockKind, Span};
use maud::{Markup, PreEscaped, html};

pub fn render_block(kind: &BlockKind) -> Markup {
    match kind {
        BlockKind::Heading { level, text } => render_heading(*level, text),
        BlockKind::Paragraph { content } => html! { p { (render_spans(content)) } },
        BlockKind::Blockquote { content } => {
            html! { blockquote { (render_spans(content)) } }
        }
        BlockKind::List { ordered, items } => {
            if *ordered {
                html! { ol { @for item in items { li { (render_spans(item)) } } } }
            } else {
                html! { ul { @for item in items { li { (render_spans(item)) } } } }
            }
        }
        BlockKind::Code { language, text } => html! {
            pre { code class={ "language-" (language.as_deref().unwrap_or("")) } { (text) } }
        },
        BlockKind::InlineContent { content } => render_spans(content),
        BlockKind::Rule => html! { hr; },
    }
}

fn render_heading(level: u8, text: &str) -> Markup {
    match level {
        1 => html! { h1 { (text) } },
        2 => html! { h2 { (text) } },
        3 => html! { h3 { (text) } },
        4 => html! { h4 { (text) } },
        5 => html! { h5 { (text) } },
        _ => html! { h6 { (text) } },
    }
}

pub fn render_spans(spans: &[Span]) -> Markup {
    html! {
        @for span in spans {
            @match span {
                Span::Text { content } => { (content) }
                Span::Strong { content } => { strong { (content) } }
                Span::Emphasis { content } => { em { (content) } }
                Span::Code { content } => { code { (content) } }
                Span::Link { content, url } => { a href=(url) { (content) } }
                Span::Html { content } => { (PreEscaped(content)) }
            }
        }
    }
}
