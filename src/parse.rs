//! Markdown → blocks.
//!
//! Turns a chapter's markdown into the flat block sequence the pager works
//! on. This is deliberately not a CommonMark-to-HTML converter: the pager
//! needs one block per top-level structure, so nesting is flattened.
//!
//! ## Flattening Rules
//!
//! - The outermost block quote or list wins. Everything inside it (nested
//!   lists, headings, code) becomes inline content of that one block.
//! - Paragraphs inside a block quote are joined with a single space.
//! - Nested list items become items of the outer list, in order.
//! - Soft and hard line breaks become a space.
//! - Blocks with no visible text are dropped.

use crate::block::{BlockKind, Span, push_span, spans_text};
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

pub fn parse_markdown(markdown: &str) -> Vec<BlockKind> {
    let mut builder = Builder::default();
    for event in Parser::new(markdown) {
        builder.event(event);
    }
    builder.finish()
}

/// The outermost open quote or list.
enum Container {
    Quote(Vec<Span>),
    List {
        ordered: bool,
        items: Vec<Vec<Span>>,
    },
}

enum Style {
    Strong,
    Emphasis,
    Link(String),
}

struct CodeBuffer {
    language: Option<String>,
    text: String,
}

#[derive(Default)]
struct Builder {
    blocks: Vec<BlockKind>,
    /// End tags of every open quote and list, outermost first.
    open: Vec<TagEnd>,
    outer: Option<Container>,
    spans: Vec<Span>,
    styles: Vec<Style>,
    code: Option<CodeBuffer>,
}

impl Builder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end),
            Event::Text(text) => match &mut self.code {
                Some(code) => code.text.push_str(&text),
                None => self.push_text(&text),
            },
            Event::Code(code) => push_span(
                &mut self.spans,
                Span::Code {
                    content: code.to_string(),
                },
            ),
            Event::Html(html) | Event::InlineHtml(html) => push_span(
                &mut self.spans,
                Span::Html {
                    content: html.to_string(),
                },
            ),
            Event::SoftBreak | Event::HardBreak => self.push_text(" "),
            Event::Rule => {
                if self.outer.is_some() {
                    self.break_inline();
                } else {
                    self.blocks.push(BlockKind::Rule);
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::BlockQuote(_) | Tag::List(_) => {
                let end = tag.to_end();
                if self.open.is_empty() {
                    self.outer = Some(match tag {
                        Tag::List(first) => Container::List {
                            ordered: first.is_some(),
                            items: Vec::new(),
                        },
                        _ => Container::Quote(Vec::new()),
                    });
                } else {
                    self.break_inline();
                }
                self.open.push(end);
            }
            Tag::Item => self.break_inline(),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(CodeBuffer {
                    language,
                    text: String::new(),
                });
            }
            Tag::Emphasis => self.styles.push(Style::Emphasis),
            Tag::Strong => self.styles.push(Style::Strong),
            Tag::Link { dest_url, .. } => self.styles.push(Style::Link(dest_url.to_string())),
            _ => {}
        }
    }

    fn end(&mut self, end: TagEnd) {
        if self.open.last() == Some(&end) {
            self.open.pop();
            self.break_inline();
            if self.open.is_empty() {
                self.finish_container();
            }
            return;
        }

        let nested = self.outer.is_some();
        match end {
            TagEnd::Paragraph if nested => self.separate(),
            TagEnd::Paragraph => {
                let content = trim_spans(std::mem::take(&mut self.spans));
                self.emit(BlockKind::Paragraph { content });
            }
            TagEnd::Heading(_) if nested => self.separate(),
            TagEnd::Heading(level) => {
                let text = spans_text(&std::mem::take(&mut self.spans));
                self.emit(BlockKind::Heading {
                    level: level as u8,
                    text: text.trim().to_string(),
                });
            }
            TagEnd::Item => self.break_inline(),
            TagEnd::CodeBlock => {
                let Some(code) = self.code.take() else {
                    return;
                };
                let text = code.text.trim_end_matches('\n').to_string();
                if nested {
                    push_span(&mut self.spans, Span::Code { content: text });
                    self.separate();
                } else {
                    self.emit(BlockKind::Code {
                        language: code.language,
                        text,
                    });
                }
            }
            TagEnd::HtmlBlock if nested => self.separate(),
            TagEnd::HtmlBlock => {
                let content = trim_spans(std::mem::take(&mut self.spans));
                self.emit(BlockKind::InlineContent { content });
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Link => {
                self.styles.pop();
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        let content = text.to_string();
        let span = match self.styles.last() {
            Some(Style::Strong) => Span::Strong { content },
            Some(Style::Emphasis) => Span::Emphasis { content },
            Some(Style::Link(url)) => Span::Link {
                content,
                url: url.clone(),
            },
            None => Span::text(content),
        };
        push_span(&mut self.spans, span);
    }

    /// End an inline run inside a container. List items keep growing.
    fn separate(&mut self) {
        match self.outer {
            Some(Container::List { .. }) => push_span(&mut self.spans, Span::text(" ")),
            _ => self.break_inline(),
        }
    }

    /// Move the pending inline run into the outer container.
    fn break_inline(&mut self) {
        let spans = trim_spans(std::mem::take(&mut self.spans));
        if spans.is_empty() {
            return;
        }
        match &mut self.outer {
            Some(Container::Quote(content)) => {
                if !content.is_empty() {
                    push_span(content, Span::text(" "));
                }
                for span in spans {
                    push_span(content, span);
                }
            }
            Some(Container::List { items, .. }) => items.push(spans),
            None => self.spans = spans,
        }
    }

    fn finish_container(&mut self) {
        match self.outer.take() {
            Some(Container::Quote(content)) => self.emit(BlockKind::Blockquote { content }),
            Some(Container::List { ordered, items }) => {
                self.emit(BlockKind::List { ordered, items })
            }
            None => {}
        }
    }

    fn emit(&mut self, kind: BlockKind) {
        if !kind.is_blank() {
            self.blocks.push(kind);
        }
    }

    fn finish(mut self) -> Vec<BlockKind> {
        if self.outer.is_some() {
            self.break_inline();
            self.finish_container();
        }
        let content = trim_spans(std::mem::take(&mut self.spans));
        self.emit(BlockKind::Paragraph { content });
        self.blocks
    }
}

/// Drop leading and trailing whitespace from a span run.
fn trim_spans(mut spans: Vec<Span>) -> Vec<Span> {
    while spans.first().is_some_and(|s| s.content().trim().is_empty()) {
        spans.remove(0);
    }
    while spans.last().is_some_and(|s| s.content().trim().is_empty()) {
        spans.pop();
    }
    if let Some(first) = spans.first_mut() {
        *first = first.restyle(first.content().trim_start().to_string());
    }
    if let Some(last) = spans.last_mut() {
        *last = last.restyle(last.content().trim_end().to_string());
    }
    spans
}
