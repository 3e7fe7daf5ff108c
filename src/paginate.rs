//! The pager: partition a block stream into pages.
//!
//! [`paginate`] takes a chapter's blocks in document order and a
//! [`PaginationPolicy`], and returns pages that a renderer can lay out one by
//! one. It is a pure function: no I/O, no shared state, and identical inputs
//! always yield identical pages, so chapters can be paginated in parallel.
//!
//! ## Guarantees
//!
//! - **Order**: concatenating every page's blocks reproduces the input, with
//!   split paragraphs concatenating back to the original text.
//! - **Capacity**: a page's total size is within capacity, except a page that
//!   holds exactly one block that is itself larger than capacity.
//! - **No empty pages**.
//!
//! ## Break Rules
//!
//! The scan is greedy. A block that would overflow the current page starts a
//! new one. Three rules refine that:
//!
//! - **Heading guard**: a heading arriving after the page is already past
//!   `heading_guard_fraction` of capacity starts a new page even if it fits.
//! - **Heading binding**: headings left at the tail of a page that is being
//!   closed are carried to the next page along with the block that follows
//!   them. They stay behind only when the following block is an oversized
//!   non-paragraph, when carrying would empty the closed page, or when the
//!   headings and the following block would not fit together.
//! - **Oversized blocks**: a paragraph larger than capacity is cut at word
//!   boundaries into paragraph chunks, one per page. Any other oversized block
//!   (code, lists, quotes) goes on a page of its own, unsplit.
//!
//! Title deduplication is not the pager's job. A caller that synthesizes a
//! chapter heading asks [`PaginationPolicy::needs_title`] first.

use crate::block::{Block, BlockKind, Span, push_span, spans_text};
use crate::measure::{Measure, SizeMeasurer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default fraction of capacity after which a heading forces a page break.
pub const DEFAULT_HEADING_GUARD: f64 = 0.7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaginateError {
    #[error("Invalid pagination policy: {0}")]
    InvalidPolicy(String),
    #[error("Invalid block at index {index}: {reason}")]
    InvalidBlock { index: usize, reason: String },
}

/// How pages are filled.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationPolicy {
    /// Maximum page size, in the unit of `measure`.
    pub capacity: usize,
    /// A heading arriving after this fraction of capacity starts a new page.
    pub heading_guard_fraction: f64,
    /// A title the caller may synthesize as a leading heading.
    pub dedupe_title: Option<String>,
    /// Measures chunks of split paragraphs.
    pub measure: Measure,
}

impl PaginationPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heading_guard_fraction: DEFAULT_HEADING_GUARD,
            dedupe_title: None,
            measure: Measure::default(),
        }
    }

    pub fn with_heading_guard(mut self, fraction: f64) -> Self {
        self.heading_guard_fraction = fraction;
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_dedupe_title(mut self, title: impl Into<String>) -> Self {
        self.dedupe_title = Some(title.into());
        self
    }

    pub fn validate(&self) -> Result<(), PaginateError> {
        if self.capacity == 0 {
            return Err(PaginateError::InvalidPolicy(
                "capacity must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.heading_guard_fraction) {
            return Err(PaginateError::InvalidPolicy(format!(
                "heading guard fraction {} is outside 0..=1",
                self.heading_guard_fraction
            )));
        }
        Ok(())
    }

    /// Whether a caller should prepend `dedupe_title` as a level-1 heading.
    ///
    /// False when there is no title to dedupe, or when `blocks` already lead
    /// with a level-1 heading carrying the same text (compared trimmed and
    /// case-insensitively).
    pub fn needs_title(&self, blocks: &[BlockKind]) -> bool {
        let Some(title) = &self.dedupe_title else {
            return false;
        };
        !matches!(
            blocks.first(),
            Some(BlockKind::Heading { level: 1, text }) if same_title(text, title)
        )
    }
}

fn same_title(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// An ordered, non-empty group of blocks displayed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PageData")]
pub struct Page {
    blocks: Vec<Block>,
}

#[derive(Deserialize)]
struct PageData {
    blocks: Vec<Block>,
}

impl TryFrom<PageData> for Page {
    type Error = &'static str;

    fn try_from(data: PageData) -> Result<Self, Self::Error> {
        if data.blocks.is_empty() {
            return Err("a page must hold at least one block");
        }
        Ok(Page {
            blocks: data.blocks,
        })
    }
}

impl Page {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Total size of the page's blocks.
    pub fn size(&self) -> usize {
        self.blocks.iter().map(Block::size).sum()
    }

    /// First heading on the page, if any.
    pub fn first_heading(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b.kind() {
            BlockKind::Heading { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    fn is_blank(&self) -> bool {
        self.blocks.iter().all(Block::is_blank)
    }
}

/// Paginate `blocks` under `policy`, sizing split paragraphs with `policy.measure`.
pub fn paginate(blocks: &[Block], policy: &PaginationPolicy) -> Result<Vec<Page>, PaginateError> {
    Pager::new(policy.clone()).paginate(blocks)
}

/// A page together with the index of the input block it starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPage {
    pub source: usize,
    pub page: Page,
}

/// A configured pager. Use [`Pager::with_measurer`] to size split paragraphs
/// with something other than the policy's [`Measure`].
pub struct Pager<'m> {
    policy: PaginationPolicy,
    measurer: Option<&'m dyn SizeMeasurer>,
}

impl<'m> Pager<'m> {
    pub fn new(policy: PaginationPolicy) -> Self {
        Self {
            policy,
            measurer: None,
        }
    }

    pub fn with_measurer(mut self, measurer: &'m dyn SizeMeasurer) -> Self {
        self.measurer = Some(measurer);
        self
    }

    pub fn policy(&self) -> &PaginationPolicy {
        &self.policy
    }

    fn measurer(&self) -> &dyn SizeMeasurer {
        match self.measurer {
            Some(m) => m,
            None => &self.policy.measure,
        }
    }

    pub fn paginate(&self, blocks: &[Block]) -> Result<Vec<Page>, PaginateError> {
        Ok(self
            .paginate_placed(blocks)?
            .into_iter()
            .map(|placed| placed.page)
            .collect())
    }

    /// Like [`Pager::paginate`], but each page also reports the input index of
    /// its first block. Chunks of a split paragraph all report the paragraph.
    pub fn paginate_placed(&self, blocks: &[Block]) -> Result<Vec<PlacedPage>, PaginateError> {
        self.policy.validate()?;
        for (index, block) in blocks.iter().enumerate() {
            block
                .check()
                .map_err(|reason| PaginateError::InvalidBlock { index, reason })?;
        }

        let capacity = self.policy.capacity;
        let mut flow = Flow::new(&self.policy);
        for (index, block) in blocks.iter().enumerate() {
            match block.kind() {
                BlockKind::Paragraph { content } if block.size() > capacity => {
                    self.place_split(&mut flow, index, content);
                }
                _ => {
                    if block.size() > capacity {
                        debug!(
                            index,
                            size = block.size(),
                            capacity,
                            "oversized {} placed on its own page",
                            block.kind().name()
                        );
                    }
                    flow.place(index, block.clone());
                }
            }
        }

        let mut pages = flow.finish();
        pages.retain(|placed| !placed.page.is_blank());
        debug!(
            blocks = blocks.len(),
            pages = pages.len(),
            capacity,
            "paginated"
        );
        Ok(pages)
    }

    /// Place an oversized paragraph as a run of chunks, one per page.
    ///
    /// The current page is closed first. Headings carried over from it share
    /// the first chunk's page, so that chunk is cut to the room they leave.
    fn place_split(&self, flow: &mut Flow, index: usize, content: &[Span]) {
        let measurer = self.measurer();
        let capacity = self.policy.capacity;
        let segments = segment_words(content);

        if flow.is_open() {
            let first = segments
                .first()
                .map(|segment| measure_spans(measurer, segment))
                .unwrap_or(0);
            flow.break_page(first);
        }

        let first_budget = capacity.saturating_sub(flow.total);
        let chunks = chunk_segments(&segments, first_budget, capacity, measurer);
        debug!(
            index,
            chunks = chunks.len(),
            capacity,
            "split oversized paragraph"
        );
        for (i, chunk) in chunks.into_iter().enumerate() {
            if i > 0 {
                flow.flush();
            }
            flow.push(index, chunk);
        }
    }
}

/// Accumulator for the page being filled.
struct Flow {
    capacity: usize,
    guard_threshold: f64,
    current: Vec<(usize, Block)>,
    total: usize,
    pages: Vec<PlacedPage>,
}

impl Flow {
    fn new(policy: &PaginationPolicy) -> Self {
        Self {
            capacity: policy.capacity,
            guard_threshold: policy.capacity as f64 * policy.heading_guard_fraction,
            current: Vec::new(),
            total: 0,
            pages: Vec::new(),
        }
    }

    fn is_open(&self) -> bool {
        !self.current.is_empty()
    }

    fn place(&mut self, index: usize, block: Block) {
        let would_exceed = self.total + block.size() > self.capacity;
        let guarded = block.kind().is_heading() && self.total as f64 > self.guard_threshold;
        if (would_exceed || guarded) && self.is_open() {
            if block.size() > self.capacity {
                // Oversized blocks stand alone; preceding headings stay put.
                self.flush();
            } else {
                if guarded && !would_exceed {
                    debug!(index, total = self.total, "heading guard forced a break");
                }
                self.break_page(block.size());
            }
        }
        self.push(index, block);
    }

    /// Close the current page, carrying trailing headings over when they fit
    /// with `next_size` worth of following content.
    fn break_page(&mut self, next_size: usize) {
        let tail = self
            .current
            .iter()
            .rev()
            .take_while(|(_, block)| block.kind().is_heading())
            .count();
        let carried_size: usize = self.current[self.current.len() - tail..]
            .iter()
            .map(|(_, block)| block.size())
            .sum();

        let carry = tail > 0
            && tail < self.current.len()
            && carried_size + next_size <= self.capacity;
        let carried = if carry {
            self.current.split_off(self.current.len() - tail)
        } else {
            Vec::new()
        };

        self.flush();
        for (index, block) in carried {
            self.push(index, block);
        }
    }

    fn push(&mut self, index: usize, block: Block) {
        self.total += block.size();
        self.current.push((index, block));
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let current = std::mem::take(&mut self.current);
        let source = current[0].0;
        self.pages.push(PlacedPage {
            source,
            page: Page {
                blocks: current.into_iter().map(|(_, block)| block).collect(),
            },
        });
        self.total = 0;
    }

    fn finish(mut self) -> Vec<PlacedPage> {
        self.flush();
        self.pages
    }
}

/// Cut spans into word segments, preserving styles and every character.
///
/// A segment is one word plus the whitespace after it; whitespace before the
/// first word belongs to the first segment. A word may cross span boundaries
/// (`**bold**tail`), so a segment is itself a span sequence. Raw markup spans
/// are never cut.
fn segment_words(spans: &[Span]) -> Vec<Vec<Span>> {
    let mut segments = Vec::new();
    let mut current: Vec<Span> = Vec::new();
    let mut has_word = false;
    let mut after_word_space = false;

    for span in spans {
        if let Span::Html { .. } = span {
            if after_word_space {
                segments.push(std::mem::take(&mut current));
                after_word_space = false;
            }
            current.push(span.clone());
            has_word = true;
            continue;
        }

        let text = span.content();
        let mut start = 0;
        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                if has_word {
                    after_word_space = true;
                }
            } else if after_word_space {
                if i > start {
                    current.push(span.restyle(text[start..i].to_string()));
                }
                segments.push(std::mem::take(&mut current));
                start = i;
                after_word_space = false;
            } else {
                has_word = true;
            }
        }
        if start < text.len() {
            current.push(span.restyle(text[start..].to_string()));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Group segments into paragraph chunks: the first within `first_budget`,
/// the rest within `capacity`. A chunk always holds at least one segment.
fn chunk_segments(
    segments: &[Vec<Span>],
    first_budget: usize,
    capacity: usize,
    measurer: &dyn SizeMeasurer,
) -> Vec<Block> {
    let mut chunks = Vec::new();
    let mut current: Vec<Span> = Vec::new();
    let mut current_size = 0;

    for segment in segments {
        let mut candidate = current.clone();
        for span in segment {
            push_span(&mut candidate, span.clone());
        }
        let size = measure_spans(measurer, &candidate);
        let budget = if chunks.is_empty() {
            first_budget
        } else {
            capacity
        };
        if size > budget && !current.is_empty() {
            chunks.push(paragraph_chunk(std::mem::take(&mut current), current_size));
            for span in segment {
                push_span(&mut current, span.clone());
            }
            current_size = measure_spans(measurer, &current);
        } else {
            current = candidate;
            current_size = size;
        }
    }
    if !current.is_empty() {
        chunks.push(paragraph_chunk(current, current_size));
    }
    chunks
}

fn measure_spans(measurer: &dyn SizeMeasurer, spans: &[Span]) -> usize {
    measurer.measure(&BlockKind::Paragraph {
        content: spans.to_vec(),
    })
}

fn paragraph_chunk(content: Vec<Span>, size: usize) -> Block {
    debug_assert!(!spans_text(&content).is_empty());
    Block::new(BlockKind::Paragraph { content }, size)
}
