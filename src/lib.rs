//! # Folio
//!
//! A static site generator that turns a directory of markdown chapters into a
//! paginated handbook: a flipbook you page through in the browser, and a print
//! document with one sheet per page.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! Folio processes content through three independent stages, each producing
//! a JSON file that the next stage consumes:
//!
//! ```text
//! 1. Scan      chapters/  →  manifest.json   (filesystem → measured blocks)
//! 2. Paginate  manifest   →  pages.json      (blocks → numbered pages)
//! 3. Generate  pages      →  dist/           (flipbook views + print document)
//! ```
//!
//! Each intermediate file is human-readable JSON, so a pagination surprise can
//! be traced to the blocks and sizes that caused it. Every stage is a function
//! from one document to the next, so tests exercise pipeline logic without a
//! browser.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: walks the chapters directory, parses and measures chapters, builds the contents tree |
//! | [`book`] | Stage 2: paginates every chapter and numbers the pages |
//! | [`generate`] | Stage 3: renders flipbook views and the print document with Maud |
//! | [`paginate`] | The pager: splits a block stream into pages under a capacity and break rules |
//! | [`block`] | Content blocks and inline spans |
//! | [`parse`] | Markdown → blocks, via pulldown-cmark |
//! | [`measure`] | Block size measurement (visible words, markup characters) |
//! | [`render`] | Block → HTML, shared by the chars measure and the generate stage |
//! | [`viewer`] | Spread layout and the flip navigation state machine |
//! | [`config`] | Hierarchical `config.toml` loading, validation, merging, and CSS generation |
//! | [`types`] | Shared types serialized between stages (`TocEntry`) |
//! | [`naming`] | `NNN-name` filename convention parser |
//! | [`output`] | CLI output formatting: tree-based display of pipeline results |
//!
//! # Design Decisions
//!
//! ## One Pager, Many Layouts
//!
//! Character budgets and word budgets, three columns or two-page spreads: these
//! are values of a [`paginate::PaginationPolicy`], not separate algorithms. The
//! measure decides what a block costs; the pager only ever compares sums
//! against capacity.
//!
//! ## Sizes Are Measured Once
//!
//! The scan stage measures every block and stores the size beside it. The pager
//! never re-measures whole blocks, which keeps it a pure function of its input
//! and lets chapters be paginated in parallel.
//!
//! ## Config Cascading (Root → Section)
//!
//! Configuration files at any level of the chapters tree override their parent:
//!
//! ```text
//! chapters/config.toml                  ← root (overrides stock defaults)
//! chapters/020-policies/config.toml     ← section (overrides root)
//! ```
//!
//! Sections honor `[pagination]`, so a dense reference section can use a
//! larger page budget than the narrative chapters around it.
//!
//! ## NNN-Prefix Ordering
//!
//! Chapters and sections use a numeric prefix (`010-`, `020-`, etc.) for
//! explicit ordering, parsed by [`naming::parse_entry_name`]. The filesystem is
//! the source of truth: no front-matter, no separate ordering file.

pub mod block;
pub mod book;
pub mod config;
pub mod generate;
pub mod measure;
pub mod naming;
pub mod output;
pub mod paginate;
pub mod parse;
pub mod render;
pub mod scan;
pub mod types;
pub mod viewer;

#[cfg(test)]
pub(crate) mod test_helpers;
