//! Book assembly: paginate every chapter and number the pages.
//!
//! Stage 2 of the folio build pipeline. Takes the scan manifest and produces
//! the paged book the generate stage renders.
//!
//! ## Page Numbers
//!
//! The book opens with [`FRONT_LEAVES`] unnumbered-in-content leaves (the
//! cover and the contents page), so the first content page is page 3. Every
//! leaf counts toward the number, like a printed book.
//!
//! ## Chapter Breaks
//!
//! With `pagination.chapter_breaks` on (the default), each chapter is
//! paginated on its own under its section's settings and starts on a fresh
//! page. Chapters are independent, so they are paginated in parallel.
//!
//! With it off, every chapter's blocks flow as one stream under the root
//! settings. Blocks a section sized in another unit are re-measured in the
//! root unit first. A page belongs to the chapter of its first block, and a chapter
//! starts on the page holding its first block.

use crate::block::Block;
use crate::config::HandbookConfig;
use crate::paginate::{Page, PaginateError, Pager};
use crate::scan::{Chapter, Manifest};
use crate::types::TocEntry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Leaves before the first content page: the cover and the contents page.
pub const FRONT_LEAVES: usize = 2;

#[derive(Error, Debug)]
pub enum BookError {
    #[error("Chapter '{slug}' could not be paginated: {source}")]
    Chapter {
        slug: String,
        #[source]
        source: PaginateError,
    },
}

/// Paginated handbook, the input of the generate stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedBook {
    /// Contents tree with every entry's page filled in.
    pub toc: Vec<TocEntry>,
    pub chapters: Vec<ChapterEntry>,
    /// Content pages in reading order.
    pub pages: Vec<BookPage>,
    pub config: HandbookConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterEntry {
    pub title: String,
    pub slug: String,
    /// Book page number the chapter starts on.
    pub first_page: usize,
    /// Pages whose first block belongs to this chapter.
    pub page_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookPage {
    /// Book page number, counting the front leaves.
    pub number: usize,
    /// Index into [`PagedBook::chapters`].
    pub chapter: usize,
    pub page: Page,
}

impl PagedBook {
    /// Every leaf of the book: front leaves plus content pages.
    pub fn leaf_count(&self) -> usize {
        FRONT_LEAVES + self.pages.len()
    }

    /// Running head for a content page: its chapter's title.
    pub fn running_head(&self, page: &BookPage) -> &str {
        self.chapters
            .get(page.chapter)
            .map(|c| c.title.as_str())
            .unwrap_or_default()
    }
}

/// Book page number of the content page at `index`.
pub fn page_number(index: usize) -> usize {
    FRONT_LEAVES + index + 1
}

pub fn paginate_book(manifest: &Manifest) -> Result<PagedBook, BookError> {
    let config = &manifest.config;
    let (pages, mut chapters) = if config.pagination.chapter_breaks {
        paginate_separately(&manifest.chapters)?
    } else {
        paginate_flowing(&manifest.chapters, config)?
    };

    let last = page_number(pages.len().saturating_sub(1));
    for entry in chapters.iter_mut().filter(|c| c.page_count == 0) {
        warn!(slug = %entry.slug, "chapter produced no pages");
        entry.first_page = entry.first_page.min(last);
    }

    let mut toc = manifest.toc.clone();
    fill_toc_pages(&mut toc, &chapters);

    info!(
        chapters = chapters.len(),
        pages = pages.len(),
        "pagination complete"
    );
    Ok(PagedBook {
        toc,
        chapters,
        pages,
        config: config.clone(),
    })
}

type Paged = (Vec<BookPage>, Vec<ChapterEntry>);

fn paginate_separately(chapters: &[Chapter]) -> Result<Paged, BookError> {
    let per_chapter: Vec<Vec<Page>> = chapters
        .par_iter()
        .map(|chapter| {
            let pager = Pager::new(chapter.pagination.to_policy());
            let pages = pager
                .paginate(&chapter.blocks)
                .map_err(|source| BookError::Chapter {
                    slug: chapter.slug.clone(),
                    source,
                })?;
            debug!(slug = %chapter.slug, pages = pages.len(), "paginated chapter");
            Ok(pages)
        })
        .collect::<Result<_, BookError>>()?;

    let mut pages = Vec::new();
    let mut entries = Vec::with_capacity(chapters.len());
    for (index, (chapter, chapter_pages)) in chapters.iter().zip(per_chapter).enumerate() {
        entries.push(ChapterEntry {
            title: chapter.title.clone(),
            slug: chapter.slug.clone(),
            first_page: page_number(pages.len()),
            page_count: chapter_pages.len(),
        });
        pages.extend(chapter_pages.into_iter().map(|page| BookPage {
            number: 0,
            chapter: index,
            page,
        }));
    }
    number_pages(&mut pages);
    Ok((pages, entries))
}

fn paginate_flowing(chapters: &[Chapter], config: &HandbookConfig) -> Result<Paged, BookError> {
    let measure = config.pagination.measure;
    let mut starts = Vec::with_capacity(chapters.len());
    let mut blocks = Vec::new();
    for chapter in chapters {
        starts.push(blocks.len());
        if chapter.pagination.measure == measure {
            blocks.extend(chapter.blocks.iter().cloned());
        } else {
            debug!(slug = %chapter.slug, unit = measure.unit(), "re-measuring chapter for the shared flow");
            blocks.extend(
                chapter
                    .blocks
                    .iter()
                    .cloned()
                    .map(|block| Block::measured(block.into_kind(), &measure)),
            );
        }
    }

    let pager = Pager::new(config.pagination.to_policy());
    let placed = pager
        .paginate_placed(&blocks)
        .map_err(|source| BookError::Chapter {
            slug: "(all chapters)".to_string(),
            source,
        })?;

    let chapter_of = |block: usize| starts.partition_point(|&s| s <= block).saturating_sub(1);
    let entries = chapters
        .iter()
        .zip(&starts)
        .enumerate()
        .map(|(index, (chapter, &start))| {
            let holding = placed.partition_point(|p| p.source <= start).saturating_sub(1);
            ChapterEntry {
                title: chapter.title.clone(),
                slug: chapter.slug.clone(),
                first_page: page_number(holding),
                page_count: placed
                    .iter()
                    .filter(|p| chapter_of(p.source) == index)
                    .count(),
            }
        })
        .collect();

    let mut pages: Vec<BookPage> = placed
        .into_iter()
        .map(|p| BookPage {
            number: 0,
            chapter: chapter_of(p.source),
            page: p.page,
        })
        .collect();
    number_pages(&mut pages);
    Ok((pages, entries))
}

fn number_pages(pages: &mut [BookPage]) {
    for (index, page) in pages.iter_mut().enumerate() {
        page.number = page_number(index);
    }
}

/// Chapters get their first page; sections get their first chapter's.
fn fill_toc_pages(entries: &mut [TocEntry], chapters: &[ChapterEntry]) {
    for entry in entries {
        fill_toc_pages(&mut entry.children, chapters);
        entry.page = match entry.chapter {
            Some(index) => chapters.get(index).map(|c| c.first_page),
            None => entry.children.iter().find_map(|c| c.page),
        };
    }
}
