//! HTML flipbook generation.
//!
//! Stage 3 of the folio build pipeline. Takes the paged book and generates
//! the final static site: one HTML file per view of the flipbook, plus a
//! print document.
//!
//! ## Generated Files
//!
//! - **Cover view** (`/index.html`): the first view, with the cover leaf
//! - **Spreads** (`/spreads/NNN.html`): every later view, numbered from 001
//! - **Print document** (`/print.html`): every leaf as a page-sized section
//!   with CSS page breaks, for the browser's print-to-PDF
//! - **Paged book** (`/pages.json`): the paginate stage output, for other
//!   renderers
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html          # Cover (blank left, cover right)
//! ├── spreads/
//! │   ├── 001.html        # Contents + page 3
//! │   ├── 002.html        # Pages 4-5
//! │   └── ...
//! ├── print.html
//! ├── pages.json
//! └── cover.png           # Cover image (if configured)
//! ```
//!
//! ## Navigation
//!
//! Each view links to its neighbors through the [`Navigator`], and carries
//! invisible click zones plus `static/nav.js` for arrow keys and swipes.
//! Contents entries link to the view holding each chapter's first page.
//!
//! ## Cache Keys
//!
//! Asset URLs carry `?v=` with a fingerprint of the paged book, so a rebuilt
//! handbook never shows a stale cover or print document.

use crate::book::{BookPage, FRONT_LEAVES, PagedBook};
use crate::config;
use crate::render::render_block;
use crate::types::TocEntry;
use crate::viewer::{Navigator, Slot, View, ViewMode, display_page, layout, view_of_leaf};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/nav.js");

/// Hex characters of the book digest used as a cache key.
const FINGERPRINT_LEN: usize = 12;

pub fn generate(pages_path: &Path, source_dir: &Path, output_dir: &Path) -> Result<(), GenerateError> {
    let content = fs::read_to_string(pages_path)?;
    let book: PagedBook = serde_json::from_str(&content)?;
    let site = Site::new(&book, fingerprint(content.as_bytes()));

    fs::create_dir_all(output_dir.join("spreads"))?;

    if let Some(cover) = &book.config.book.cover_image
        && let Some(name) = Path::new(cover).file_name()
    {
        fs::copy(source_dir.join(cover), output_dir.join(name))?;
        debug!(cover = %cover, "copied cover image");
    }

    let views = layout(book.leaf_count(), site.mode);
    let nav = Navigator::for_leaves(book.leaf_count(), site.mode);
    for (index, view) in views.iter().enumerate() {
        let html = render_view(&site, index, view, &nav);
        fs::write(output_dir.join(view_path(index)), html.into_string())?;
    }

    fs::write(
        output_dir.join("print.html"),
        render_print(&site).into_string(),
    )?;
    fs::write(
        output_dir.join("pages.json"),
        serde_json::to_string_pretty(&book)?,
    )?;

    info!(
        views = views.len(),
        pages = book.pages.len(),
        output = %output_dir.display(),
        "site generated"
    );
    Ok(())
}

/// Short hex digest of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    digest[..FINGERPRINT_LEN].to_string()
}

/// Output path of a view, relative to the site root.
pub fn view_path(view: usize) -> String {
    match view {
        0 => "index.html".to_string(),
        n => format!("spreads/{n:03}.html"),
    }
}

/// Prefix that leads from a view's file back to the site root.
fn root_of(view: usize) -> &'static str {
    if view == 0 { "" } else { "../" }
}

fn view_href(root: &str, view: usize) -> String {
    format!("{root}{}", view_path(view))
}

/// What sits on one leaf of the book.
#[derive(Debug, Clone, Copy)]
pub enum Leaf<'a> {
    Cover,
    Contents,
    Content(&'a BookPage),
}

/// Everything the renderers share.
struct Site<'a> {
    book: &'a PagedBook,
    css: String,
    fingerprint: String,
    mode: ViewMode,
}

impl<'a> Site<'a> {
    fn new(book: &'a PagedBook, fingerprint: String) -> Self {
        let css = format!(
            "{}\n\n{}\n\n{}",
            config::generate_color_css(&book.config.colors),
            config::generate_layout_css(&book.config.layout),
            CSS_STATIC
        );
        Self {
            book,
            css,
            fingerprint,
            mode: ViewMode::from_spreads(book.config.layout.spreads),
        }
    }

    fn leaf(&self, index: usize) -> Option<Leaf<'a>> {
        match index {
            0 => Some(Leaf::Cover),
            1 => Some(Leaf::Contents),
            n => self.book.pages.get(n - FRONT_LEAVES).map(Leaf::Content),
        }
    }

    fn asset(&self, root: &str, path: &str) -> String {
        format!("{root}{path}?v={}", self.fingerprint)
    }
}

/// Where contents entries point.
enum Links<'r> {
    /// Another view file, relative to `root`.
    Views(&'r str),
    /// An anchor in the same document.
    Anchors,
}

impl Links<'_> {
    fn page(&self, number: usize, mode: ViewMode) -> String {
        match self {
            Links::Views(root) => view_href(root, view_of_leaf(number - 1, mode)),
            Links::Anchors => format!("#page-{number}"),
        }
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, css: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders the header bar with the book title and shortcuts
fn site_header(site: &Site, root: &str) -> Markup {
    let contents = view_of_leaf(1, site.mode);
    html! {
        header.site-header {
            a.book-title href={ (root) "index.html" } { (site.book.config.book.title) }
            nav.site-nav {
                a href=(view_href(root, contents)) { "Contents" }
                a href=(site.asset(root, "print.html")) { "Print" }
            }
        }
    }
}

fn render_leaf(site: &Site, slot: Slot, root: &str, links: &Links) -> Markup {
    let leaf = match slot {
        Slot::Leaf(index) => site.leaf(index),
        Slot::Blank => None,
    };
    match leaf {
        None => html! { div.page.blank-page {} },
        Some(Leaf::Cover) => render_cover(site, root),
        Some(Leaf::Contents) => render_contents(site, links),
        Some(Leaf::Content(page)) => render_content_page(site.book, page),
    }
}

fn render_cover(site: &Site, root: &str) -> Markup {
    let book = &site.book.config.book;
    let image = book
        .cover_image
        .as_deref()
        .and_then(|c| Path::new(c).file_name())
        .map(|name| site.asset(root, &name.to_string_lossy()));
    html! {
        section.page.cover-page id="page-1" {
            div.cover-content {
                h1.cover-title { (book.title) }
                @if !book.subtitle.is_empty() {
                    p.subtitle { (book.subtitle) }
                }
                @if let Some(src) = image {
                    div.cover-image {
                        img src=(src) alt=(book.title);
                    }
                }
                div.cover-footer {
                    @if !book.tagline.is_empty() {
                        p.tagline { (book.tagline) }
                    }
                    p.version { "Edition " (book.version) }
                }
            }
        }
    }
}

fn render_contents(site: &Site, links: &Links) -> Markup {
    html! {
        section.page.contents-page id="page-2" {
            h1 { "Contents" }
            (render_toc(&site.book.toc, site.mode, links))
        }
    }
}

fn render_toc(entries: &[TocEntry], mode: ViewMode, links: &Links) -> Markup {
    html! {
        ul.toc-list {
            @for entry in entries {
                li class=[(!entry.children.is_empty()).then_some("toc-section")] {
                    @if let Some(page) = entry.page {
                        a href=(links.page(page, mode)) {
                            span.toc-title { (entry.title) }
                            span.toc-page { (page) }
                        }
                    } @else {
                        span.toc-title { (entry.title) }
                    }
                    @if !entry.children.is_empty() {
                        (render_toc(&entry.children, mode, links))
                    }
                }
            }
        }
    }
}

fn render_content_page(book: &PagedBook, page: &BookPage) -> Markup {
    html! {
        article.page.content-page id={ "page-" (page.number) } {
            header.running-head { (book.running_head(page)) }
            div.page-content {
                @for block in page.page.blocks() {
                    (render_block(block.kind()))
                }
            }
            footer.folio { (page.number) }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders one view of the flipbook with its navigation
fn render_view(site: &Site, index: usize, view: &View, nav: &Navigator) -> Markup {
    let root = root_of(index);
    let (prev, next) = nav.neighbors(index);
    let prev_url = prev.map(|v| view_href(root, v));
    let next_url = next.map(|v| view_href(root, v));
    let links = Links::Views(root);

    let body_class = match site.mode {
        ViewMode::Spread => "spread-view",
        ViewMode::Single => "single-view",
    };
    let page_title = match index {
        0 => site.book.config.book.title.clone(),
        _ => format!(
            "{} · {}",
            site.book.config.book.title,
            display_page(index, site.mode)
        ),
    };

    let content = html! {
        (site_header(site, root))
        main.desk {
            div.book data-view=(index) {
                @for slot in view.slots() {
                    (render_leaf(site, slot, root, &links))
                }
            }
        }
        nav.controls {
            a.prev href=[prev_url.as_deref()] aria-label="Previous" { "‹" }
            span.counter {
                (display_page(index, site.mode)) " / " (site.book.leaf_count())
            }
            a.next href=[next_url.as_deref()] aria-label="Next" { "›" }
        }
        div.nav-zones data-prev=[prev_url.as_deref()] data-next=[next_url.as_deref()] {}
        script { (PreEscaped(JS)) }
    };

    base_document(&page_title, &site.css, Some(body_class), content)
}

/// Renders every leaf in order for the browser print engine
fn render_print(site: &Site) -> Markup {
    let content = html! {
        @for index in 0..site.book.leaf_count() {
            (render_leaf(site, Slot::Leaf(index), "", &Links::Anchors))
        }
    };
    base_document(&site.book.config.book.title, &site.css, Some("print"), content)
}

// ============================================================================
// Tests
// ============================================================================
