//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every entity (section, chapter) is its semantic identity: positional
//! index and title. Source files, page ranges and output paths are secondary
//! context, shown on indented lines or after an arrow.
//!
//! # Entity Display Contract
//!
//! Every entity follows the same two-level pattern across all stages:
//!
//! 1. **Header line**: positional index + title (+ optional detail)
//! 2. **Context lines**: indented `Source:`, `Capacity:`, etc.
//!
//! The contents tree drives the order in every stage, so the same chapter
//! sits at the same position in scan, paginate and generate output.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Contents
//! 001 Welcome (9 blocks, 112 words)
//!     Source: 010-welcome.md
//! 002 Policies
//!     001 Office Hours (6 blocks, 81 words)
//!         Source: 020-policies/010-office-hours.md
//!         Capacity: 80 words
//!
//! Config
//!     config.toml
//! ```
//!
//! ## Paginate
//!
//! ```text
//! 001 Welcome → pages 3-4
//! 002 Policies
//!     001 Office Hours → page 5
//!
//! Paginated 4 chapters into 7 pages (9 leaves, 5 views)
//! ```
//!
//! ## Generate
//!
//! ```text
//! Cover → index.html
//! 001 Welcome → spreads/001.html
//! 002 Policies
//!     001 Office Hours → spreads/002.html
//! Print → print.html
//!
//! Generated 5 views, 9 leaves
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::book::PagedBook;
use crate::generate::view_path;
use crate::scan::{Chapter, Manifest};
use crate::types::TocEntry;
use crate::viewer::{ViewMode, total_views, view_of_leaf};
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + title, with optional detail.
///
/// ```text
/// 001 Welcome (9 blocks, 112 words)
/// 002 Policies
/// ```
fn entity_header(index: usize, title: &str, detail: Option<&str>) -> String {
    match detail {
        Some(d) => format!("{} {} ({})", format_index(index), title, d),
        None => format!("{} {}", format_index(index), title),
    }
}

/// Page range of a chapter: `page 5`, `pages 3-4`.
fn page_range(first: usize, count: usize) -> String {
    match count {
        0 => format!("shares page {}", first),
        1 => format!("page {}", first),
        n => format!("pages {}-{}", first, first + n - 1),
    }
}

fn chapter_detail(chapter: &Chapter) -> String {
    let size: usize = chapter.blocks.iter().map(|b| b.size()).sum();
    format!(
        "{} blocks, {} {}",
        chapter.blocks.len(),
        size,
        chapter.pagination.measure.unit()
    )
}

// ============================================================================
// Tree walker
// ============================================================================

/// A flattened node from walking the contents tree.
struct TreeNode<'a> {
    depth: usize,
    position: usize,
    entry: &'a TocEntry,
}

/// Walk the contents tree, assigning positional indices per sibling level.
fn walk_toc(toc: &[TocEntry]) -> Vec<TreeNode<'_>> {
    let mut nodes = Vec::new();
    walk_toc_recursive(toc, 0, &mut nodes);
    nodes
}

fn walk_toc_recursive<'a>(entries: &'a [TocEntry], depth: usize, nodes: &mut Vec<TreeNode<'a>>) {
    for (i, entry) in entries.iter().enumerate() {
        nodes.push(TreeNode {
            depth,
            position: i + 1,
            entry,
        });
        walk_toc_recursive(&entry.children, depth + 1, nodes);
    }
}

// ============================================================================
// Stage 1: Scan output
// ============================================================================

/// Format scan stage output showing the discovered handbook structure.
///
/// A chapter's capacity is shown only where a section config changed it.
pub fn format_scan_output(manifest: &Manifest, source_root: &Path) -> Vec<String> {
    let mut lines = vec!["Contents".to_string()];
    let root_capacity = manifest.config.pagination.capacity;

    for node in walk_toc(&manifest.toc) {
        let base_indent = indent(node.depth);
        let chapter = node.entry.chapter.and_then(|i| manifest.chapters.get(i));
        match chapter {
            None => lines.push(format!(
                "{}{}",
                base_indent,
                entity_header(node.position, &node.entry.title, None)
            )),
            Some(chapter) => {
                let detail = chapter_detail(chapter);
                lines.push(format!(
                    "{}{}",
                    base_indent,
                    entity_header(node.position, &chapter.title, Some(&detail))
                ));
                lines.push(format!("{}    Source: {}", base_indent, chapter.source));
                if chapter.pagination.capacity != root_capacity {
                    lines.push(format!(
                        "{}    Capacity: {} {}",
                        base_indent,
                        chapter.pagination.capacity,
                        chapter.pagination.measure.unit()
                    ));
                }
            }
        }
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if source_root.join("config.toml").exists() {
        lines.push("    config.toml".to_string());
    }
    if let Some(cover) = &manifest.config.book.cover_image {
        lines.push(format!("    {}", cover));
    }

    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(manifest: &Manifest, source_root: &Path) {
    for line in format_scan_output(manifest, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Paginate output
// ============================================================================

/// Format paginate stage output: the page range of every chapter.
pub fn format_paginate_output(book: &PagedBook) -> Vec<String> {
    let mut lines = Vec::new();

    for node in walk_toc(&book.toc) {
        let base_indent = indent(node.depth);
        let header = entity_header(node.position, &node.entry.title, None);
        match node.entry.chapter.and_then(|i| book.chapters.get(i)) {
            Some(chapter) => lines.push(format!(
                "{}{} \u{2192} {}",
                base_indent,
                header,
                page_range(chapter.first_page, chapter.page_count)
            )),
            None => lines.push(format!("{}{}", base_indent, header)),
        }
    }

    let mode = ViewMode::from_spreads(book.config.layout.spreads);
    lines.push(String::new());
    lines.push(format!(
        "Paginated {} chapters into {} pages ({} leaves, {} views)",
        book.chapters.len(),
        book.pages.len(),
        book.leaf_count(),
        total_views(book.leaf_count(), mode)
    ));

    lines
}

/// Print paginate output to stdout.
pub fn print_paginate_output(book: &PagedBook) {
    for line in format_paginate_output(book) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 3: Generate output
// ============================================================================

/// Format generate stage output: the view file each chapter opens in.
pub fn format_generate_output(book: &PagedBook) -> Vec<String> {
    let mode = ViewMode::from_spreads(book.config.layout.spreads);
    let mut lines = vec![format!("Cover \u{2192} {}", view_path(0))];

    for node in walk_toc(&book.toc) {
        let base_indent = indent(node.depth);
        let header = entity_header(node.position, &node.entry.title, None);
        match node.entry.page {
            Some(page) if node.entry.chapter.is_some() => lines.push(format!(
                "{}{} \u{2192} {}",
                base_indent,
                header,
                view_path(view_of_leaf(page - 1, mode))
            )),
            _ => lines.push(format!("{}{}", base_indent, header)),
        }
    }

    lines.push("Print \u{2192} print.html".to_string());
    lines.push(String::new());
    lines.push(format!(
        "Generated {} views, {} leaves",
        total_views(book.leaf_count(), mode),
        book.leaf_count()
    ));

    lines
}

/// Print generate output to stdout.
pub fn print_generate_output(book: &PagedBook) {
    for line in format_generate_output(book) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
