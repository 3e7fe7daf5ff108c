//! Filesystem scanning and manifest generation.
//!
//! Stage 1 of the folio build pipeline. Walks a chapters directory, parses
//! every chapter into measured blocks, and produces a structured manifest
//! that the paginate stage consumes.
//!
//! ## Directory Structure
//!
//! ```text
//! chapters/                        # Chapters root
//! ├── config.toml                  # Book configuration (optional)
//! ├── cover.png                    # Cover image (optional, see [book])
//! ├── 010-welcome.md               # Chapter
//! ├── 020-policies/                # Section (appears in the contents)
//! │   ├── config.toml              # Section pagination overrides
//! │   ├── 010-office-hours.md
//! │   └── 020-grading.md
//! └── 030-appendix.md
//! ```
//!
//! ## Naming and Order
//!
//! Entries are ordered by their `NNN-` prefix, then by name; unnumbered
//! entries come last. Hidden entries (leading `.`) are skipped. A chapter's
//! slug joins the slugs of its path components (`policies-grading`).
//!
//! ## Chapter Titles
//!
//! A chapter opening with a level-1 heading takes its title from it.
//! Otherwise the title comes from the filename and, when
//! `pagination.synthesize_titles` is on, is prepended as a level-1 heading.
//! The heading is never added twice.
//!
//! ## Validation
//!
//! - Chapter slugs must be unique.
//! - The handbook must contain at least one non-empty chapter.
//! - A configured cover image must exist.

use crate::block::{Block, BlockKind};
use crate::config::{self, HandbookConfig, PaginationConfig};
use crate::naming::{compare_entries, parse_entry_name};
use crate::parse::parse_markdown;
use crate::types::TocEntry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Duplicate chapter slug '{0}' at {1}")]
    DuplicateSlug(String, PathBuf),
    #[error("No chapters found in {0}")]
    NoChapters(PathBuf),
    #[error("Cover image not found: {0}")]
    MissingCoverImage(PathBuf),
}

/// Manifest output from the scan stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub toc: Vec<TocEntry>,
    pub chapters: Vec<Chapter>,
    pub config: HandbookConfig,
}

/// A chapter with its measured blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub slug: String,
    /// Path relative to the chapters root.
    pub source: String,
    /// Pagination settings resolved through the config cascade.
    pub pagination: PaginationConfig,
    pub blocks: Vec<Block>,
}

pub fn scan(root: &Path) -> Result<Manifest, ScanError> {
    let mut cascade: BTreeMap<PathBuf, Resolved> = BTreeMap::new();
    let (config, root_value) = config::load_config(root)?;
    cascade.insert(
        root.to_path_buf(),
        Resolved {
            value: root_value,
            pagination: config.pagination.clone(),
        },
    );

    if let Some(cover) = &config.book.cover_image
        && !root.join(cover).is_file()
    {
        return Err(ScanError::MissingCoverImage(root.join(cover)));
    }

    let mut chapters: Vec<Chapter> = Vec::new();
    let mut toc = TocBuilder::default();
    let mut slugs = HashSet::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by(|a, b| {
            compare_entries(&a.file_name().to_string_lossy(), &b.file_name().to_string_lossy())
        })
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        let parent = path.parent().unwrap_or(root);
        let rel = path.strip_prefix(root).unwrap_or(path);

        if entry.file_type().is_dir() {
            let resolved = resolve_section(&cascade, parent, path)?;
            cascade.insert(path.to_path_buf(), resolved);
            let name = parse_entry_name(&entry.file_name().to_string_lossy());
            toc.open_section(entry.depth(), name.display_title, rel);
            continue;
        }
        if !is_markdown(path) {
            continue;
        }

        let Some(section) = cascade.get(parent) else {
            continue;
        };
        let Some(chapter) = read_chapter(path, rel, &section.pagination)? else {
            warn!(source = %rel.display(), "skipping chapter with no content");
            continue;
        };
        if !slugs.insert(chapter.slug.clone()) {
            return Err(ScanError::DuplicateSlug(chapter.slug, rel.to_path_buf()));
        }
        debug!(
            slug = %chapter.slug,
            blocks = chapter.blocks.len(),
            capacity = chapter.pagination.capacity,
            "scanned chapter"
        );
        toc.add_chapter(entry.depth(), &chapter, chapters.len());
        chapters.push(chapter);
    }

    if chapters.is_empty() {
        return Err(ScanError::NoChapters(root.to_path_buf()));
    }
    info!(chapters = chapters.len(), root = %root.display(), "scan complete");

    Ok(Manifest {
        toc: toc.finish(),
        chapters,
        config,
    })
}

/// Merged config value and pagination settings for one directory.
struct Resolved {
    value: toml::Value,
    pagination: PaginationConfig,
}

fn resolve_section(
    cascade: &BTreeMap<PathBuf, Resolved>,
    parent: &Path,
    dir: &Path,
) -> Result<Resolved, ScanError> {
    let base = match cascade.get(parent) {
        Some(resolved) => resolved.value.clone(),
        None => config::stock_defaults_value(),
    };
    let value = match config::load_raw_config(dir)? {
        Some(overlay) => config::merge_toml(base, overlay),
        None => base,
    };
    let pagination = config::resolve_config(value.clone(), None)?.pagination;
    Ok(Resolved { value, pagination })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

/// Parse one markdown file into a chapter. `None` for a chapter with no blocks.
fn read_chapter(
    path: &Path,
    rel: &Path,
    pagination: &PaginationConfig,
) -> Result<Option<Chapter>, ScanError> {
    let mut kinds = parse_markdown(&fs::read_to_string(path)?);
    if kinds.is_empty() {
        return Ok(None);
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_title = match parse_entry_name(&stem).display_title {
        t if t.is_empty() => stem.clone(),
        t => t,
    };
    let title = match kinds.first() {
        Some(BlockKind::Heading { level: 1, text }) => text.clone(),
        _ => file_title,
    };

    let policy = pagination.to_policy().with_dedupe_title(title.clone());
    if pagination.synthesize_titles && policy.needs_title(&kinds) {
        kinds.insert(0, BlockKind::heading(1, title.clone()));
    }

    let blocks = kinds
        .into_iter()
        .map(|kind| Block::measured(kind, &pagination.measure))
        .collect();

    Ok(Some(Chapter {
        title,
        slug: chapter_slug(rel),
        source: rel.to_string_lossy().to_string(),
        pagination: pagination.clone(),
        blocks,
    }))
}

/// Join the slugs of every path component, extension dropped.
fn chapter_slug(rel: &Path) -> String {
    let stem = rel.with_extension("");
    stem.components()
        .map(|c| {
            let raw = c.as_os_str().to_string_lossy();
            match parse_entry_name(&raw).slug {
                s if s.is_empty() => raw.to_lowercase(),
                s => s,
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Builds the contents tree while the walk visits entries in pre-order.
#[derive(Default)]
struct TocBuilder {
    roots: Vec<TocEntry>,
    open: Vec<(usize, TocEntry)>,
}

impl TocBuilder {
    fn open_section(&mut self, depth: usize, title: String, rel: &Path) {
        self.close_to(depth);
        self.open.push((
            depth,
            TocEntry {
                title,
                path: rel.to_string_lossy().to_string(),
                chapter: None,
                page: None,
                children: Vec::new(),
            },
        ));
    }

    fn add_chapter(&mut self, depth: usize, chapter: &Chapter, index: usize) {
        self.close_to(depth);
        let entry = TocEntry {
            title: chapter.title.clone(),
            path: chapter.source.clone(),
            chapter: Some(index),
            page: None,
            children: Vec::new(),
        };
        match self.open.last_mut() {
            Some((_, section)) => section.children.push(entry),
            None => self.roots.push(entry),
        }
    }

    /// Close every open section at `depth` or deeper. Empty sections vanish.
    fn close_to(&mut self, depth: usize) {
        while self.open.last().is_some_and(|(d, _)| *d >= depth) {
            let Some((_, section)) = self.open.pop() else {
                break;
            };
            if section.children.is_empty() {
                continue;
            }
            match self.open.last_mut() {
                Some((_, parent)) => parent.children.push(section),
                None => self.roots.push(section),
            }
        }
    }

    fn finish(mut self) -> Vec<TocEntry> {
        self.close_to(0);
        self.roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::Measure;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    // =========================================================================
    // Fixture handbook
    // =========================================================================

    #[test]
    fn scan_finds_all_chapters_in_order() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();

        assert_eq!(
            chapter_slugs(&manifest),
            vec![
                "welcome",
                "policies-office-hours",
                "policies-grading",
                "appendix"
            ]
        );
    }

    #[test]
    fn scan_reads_book_metadata_from_root_config() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();

        assert_eq!(manifest.config.book.title, "Faculty Handbook");
        assert_eq!(manifest.config.book.subtitle, "Westbrook College");
    }

    #[test]
    fn toc_mirrors_sections() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();

        assert_toc_shape(
            &manifest,
            &[
                ("Welcome", &[]),
                ("Policies", &["Office Hours", "Grading and Appeals"]),
                ("Appendix", &[]),
            ],
        );
    }

    #[test]
    fn toc_chapters_point_at_chapter_indices() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();

        assert_eq!(manifest.toc[0].chapter, Some(0));
        assert_eq!(manifest.toc[1].chapter, None);
        assert_eq!(manifest.toc[1].children[1].chapter, Some(2));
    }

    #[test]
    fn section_config_overrides_pagination() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();

        assert_eq!(find_chapter(&manifest, "welcome").pagination.capacity, 120);
        assert_eq!(
            find_chapter(&manifest, "policies-grading").pagination.capacity,
            80
        );
        // Keys the section leaves alone come from the root.
        assert_eq!(
            find_chapter(&manifest, "policies-grading").pagination.heading_guard,
            0.7
        );
    }

    #[test]
    fn chapter_title_comes_from_leading_heading() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();

        let grading = find_chapter(&manifest, "policies-grading");
        assert_eq!(grading.title, "Grading and Appeals");
        assert_eq!(heading_count(grading, "Grading and Appeals"), 1);
    }

    #[test]
    fn missing_title_is_synthesized_from_filename() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();

        let office = find_chapter(&manifest, "policies-office-hours");
        assert_eq!(office.title, "Office Hours");
        assert_eq!(
            office.blocks[0].kind(),
            &BlockKind::heading(1, "Office Hours")
        );
    }

    #[test]
    fn hidden_and_non_markdown_files_are_ignored() {
        let tmp = setup_fixtures();
        write(tmp.path(), ".drafts/010-secret.md", "# Secret\n");
        write(tmp.path(), "notes.txt", "not a chapter");
        let manifest = scan(tmp.path()).unwrap();

        assert_eq!(manifest.chapters.len(), 4);
    }

    // =========================================================================
    // Title deduplication
    // =========================================================================

    #[test]
    fn title_not_duplicated_when_h1_matches_filename() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "010-welcome.md", "# Welcome\n\nHello.\n");
        let manifest = scan(tmp.path()).unwrap();

        assert_eq!(heading_count(&manifest.chapters[0], "Welcome"), 1);
    }

    #[test]
    fn synthesis_can_be_disabled() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "config.toml",
            "[pagination]\nsynthesize_titles = false\n",
        );
        write(tmp.path(), "010-welcome.md", "Hello.\n");
        let manifest = scan(tmp.path()).unwrap();

        let chapter = &manifest.chapters[0];
        assert_eq!(chapter.title, "Welcome");
        assert!(!chapter.blocks[0].kind().is_heading());
    }

    #[test]
    fn leading_h2_does_not_count_as_title() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "010-rules.md", "## Parking\n\nPark nicely.\n");
        let manifest = scan(tmp.path()).unwrap();

        let chapter = &manifest.chapters[0];
        assert_eq!(chapter.title, "Rules");
        assert_eq!(chapter.blocks[0].kind(), &BlockKind::heading(1, "Rules"));
        assert_eq!(chapter.blocks[1].kind(), &BlockKind::heading(2, "Parking"));
    }

    // =========================================================================
    // Measurement
    // =========================================================================

    #[test]
    fn blocks_are_measured_with_chapter_measure() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "config.toml", "[pagination]\nmeasure = \"chars\"\n");
        write(tmp.path(), "010-a.md", "# A\n\nabc\n");
        let manifest = scan(tmp.path()).unwrap();

        let chapter = &manifest.chapters[0];
        assert_eq!(chapter.pagination.measure, Measure::Chars);
        // <h1>A</h1>, <p>abc</p>
        let sizes: Vec<usize> = chapter.blocks.iter().map(Block::size).collect();
        assert_eq!(sizes, vec![10, 10]);
    }

    #[test]
    fn words_measure_counts_visible_words() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "010-a.md", "# Big Title\n\none **two** three\n");
        let manifest = scan(tmp.path()).unwrap();

        let sizes: Vec<usize> = manifest.chapters[0].blocks.iter().map(Block::size).collect();
        assert_eq!(sizes, vec![2, 3]);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn empty_root_is_no_chapters() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(scan(tmp.path()), Err(ScanError::NoChapters(_))));
    }

    #[test]
    fn empty_chapter_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "010-blank.md", "\n\n");
        write(tmp.path(), "020-real.md", "# Real\n");
        let manifest = scan(tmp.path()).unwrap();

        assert_eq!(chapter_slugs(&manifest), vec!["real"]);
        assert_eq!(manifest.toc.len(), 1);
        assert_eq!(manifest.toc[0].chapter, Some(0));
    }

    #[test]
    fn duplicate_slug_is_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "010-intro.md", "# A\n");
        write(tmp.path(), "020-intro.md", "# B\n");
        let result = scan(tmp.path());
        assert!(matches!(result, Err(ScanError::DuplicateSlug(slug, _)) if slug == "intro"));
    }

    #[test]
    fn invalid_section_config_is_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "010-a.md", "# A\n");
        write(tmp.path(), "020-s/config.toml", "[pagination]\ncapacity = 0\n");
        write(tmp.path(), "020-s/010-b.md", "# B\n");
        assert!(matches!(scan(tmp.path()), Err(ScanError::Config(_))));
    }

    #[test]
    fn missing_cover_image_is_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "config.toml", "[book]\ncover_image = \"cover.png\"\n");
        write(tmp.path(), "010-a.md", "# A\n");
        assert!(matches!(
            scan(tmp.path()),
            Err(ScanError::MissingCoverImage(_))
        ));
    }

    #[test]
    fn empty_sections_are_left_out_of_toc() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "010-a.md", "# A\n");
        fs::create_dir_all(tmp.path().join("020-empty")).unwrap();
        let manifest = scan(tmp.path()).unwrap();
        assert_eq!(toc_titles(&manifest), vec!["A"]);
    }

    #[test]
    fn nested_sections_cascade_and_nest() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "010-outer/config.toml", "[pagination]\ncapacity = 90\n");
        write(tmp.path(), "010-outer/010-inner/010-deep.md", "# Deep\n");
        write(tmp.path(), "010-outer/020-after.md", "# After\n");
        write(tmp.path(), "020-last.md", "# Last\n");
        let manifest = scan(tmp.path()).unwrap();

        assert_eq!(
            chapter_slugs(&manifest),
            vec!["outer-inner-deep", "outer-after", "last"]
        );
        assert_eq!(
            find_chapter(&manifest, "outer-inner-deep").pagination.capacity,
            90
        );
        assert_toc_shape(&manifest, &[("Outer", &["Inner", "After"]), ("Last", &[])]);
        assert_eq!(manifest.toc[0].children[0].children[0].title, "Deep");
    }

    #[test]
    fn chapter_slug_joins_components() {
        assert_eq!(
            chapter_slug(Path::new("020-policies/010-office-hours.md")),
            "policies-office-hours"
        );
        assert_eq!(chapter_slug(Path::new("001.md")), "001");
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();
        let json = serde_json::to_string(&manifest).unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chapters.len(), manifest.chapters.len());
        assert_eq!(back.toc, manifest.toc);
    }
}
