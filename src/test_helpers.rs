//! Shared test utilities for the folio test suite.
//!
//! Provides fixture setup, block builders for pager tests, and lookup
//! helpers that work with scan-phase data structures (`Manifest`, `Chapter`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let manifest = scan(tmp.path()).unwrap();
//!
//! let grading = find_chapter(&manifest, "policies-grading");
//! assert_eq!(grading.title, "Grading and Appeals");
//!
//! assert_toc_shape(&manifest, &[
//!     ("Welcome", &[]),
//!     ("Policies", &["Office Hours", "Grading and Appeals"]),
//!     ("Appendix", &[]),
//! ]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::block::{Block, BlockKind};
use crate::scan::{Chapter, Manifest};
use crate::types::TocEntry;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/chapters/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/chapters");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Block builders
// =========================================================================

pub fn heading(level: u8, text: &str, size: usize) -> Block {
    Block::new(BlockKind::heading(level, text), size)
}

/// A paragraph with an arbitrary size, independent of its text.
pub fn sized_para(text: &str, size: usize) -> Block {
    Block::new(BlockKind::paragraph(text), size)
}

pub fn code(text: &str, size: usize) -> Block {
    Block::new(
        BlockKind::Code {
            language: None,
            text: text.to_string(),
        },
        size,
    )
}

/// `n` distinct words separated by single spaces.
pub fn words(n: usize) -> String {
    (0..n)
        .map(|i| format!("w{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// =========================================================================
// Manifest lookups: panic with a clear message on miss
// =========================================================================

/// Find a chapter by slug. Panics if not found.
pub fn find_chapter<'a>(manifest: &'a Manifest, slug: &str) -> &'a Chapter {
    manifest
        .chapters
        .iter()
        .find(|c| c.slug == slug)
        .unwrap_or_else(|| {
            let slugs = chapter_slugs(manifest);
            panic!("chapter '{slug}' not found. Available: {slugs:?}")
        })
}

/// All chapter slugs in manifest order.
pub fn chapter_slugs(manifest: &Manifest) -> Vec<&str> {
    manifest.chapters.iter().map(|c| c.slug.as_str()).collect()
}

/// How many headings in a chapter carry exactly `text`.
pub fn heading_count(chapter: &Chapter, text: &str) -> usize {
    chapter
        .blocks
        .iter()
        .filter(|b| matches!(b.kind(), BlockKind::Heading { text: t, .. } if t == text))
        .count()
}

// =========================================================================
// Contents helpers
// =========================================================================

/// Top-level contents titles in order.
pub fn toc_titles(manifest: &Manifest) -> Vec<&str> {
    manifest.toc.iter().map(|e| e.title.as_str()).collect()
}

fn child_titles(entry: &TocEntry) -> Vec<&str> {
    entry.children.iter().map(|c| c.title.as_str()).collect()
}

/// Assert that the contents tree matches an expected shape.
///
/// Each entry is `(title, children)`. Use `&[]` for chapters.
pub fn assert_toc_shape(manifest: &Manifest, expected: &[(&str, &[&str])]) {
    let expected_titles: Vec<&str> = expected.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        toc_titles(manifest),
        expected_titles,
        "toc top-level titles mismatch"
    );

    for (entry, (title, children)) in manifest.toc.iter().zip(expected) {
        assert_eq!(
            child_titles(entry),
            children.to_vec(),
            "toc children of '{title}' mismatch"
        );
    }
}
