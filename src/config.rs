//! Handbook configuration module.
//!
//! Handles loading, validating, and merging `config.toml` files. Configuration
//! is hierarchical: stock defaults are overridden by user config files at any
//! level of the chapters tree (root → section → subsection).
//!
//! ## Config File Location
//!
//! Place `config.toml` in the chapters root and/or any section directory:
//!
//! ```text
//! chapters/
//! ├── config.toml              # Root config (overrides stock defaults)
//! ├── 010-welcome.md
//! └── 020-policies/
//!     ├── config.toml          # Section config (overrides root)
//!     ├── 010-grading.md
//!     └── 020-appendices/
//!         ├── config.toml      # Subsection config (overrides section)
//!         └── 010-forms.md
//! ```
//!
//! Only `[pagination]` is read per section. Book metadata, layout, colors
//! and processing settings apply to the whole book and are taken from the
//! root.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! chapters_root = "chapters"  # Path to chapters directory (root-level only)
//!
//! [book]
//! title = "Handbook"
//! subtitle = ""
//! tagline = ""
//! version = "1.0.0"
//! # cover_image = "cover.png"
//!
//! [pagination]
//! capacity = 500            # Page budget, in units of `measure`
//! heading_guard = 0.7       # Headings past this fraction of a page start a new one
//! measure = "words"         # "words" of visible text or "chars" of markup
//! chapter_breaks = true     # Every chapter starts on a fresh page
//! synthesize_titles = true  # Add a chapter title heading when missing
//!
//! [layout]
//! spreads = true            # Two pages side by side; false = one page per view
//! page_width = "8.5in"
//! page_height = "11in"
//! columns = 3               # Text columns per page (1-4)
//!
//! [colors]
//! desk = "#1a1a1a"          # Behind the book
//! page = "#faf8f3"
//! cover = "#3d2817"
//! cover_text = "#e8e6e1"
//! text = "#2c2c2c"
//! text_muted = "#6b6b6b"    # Page numbers, running heads
//! accent = "#8b4513"        # Headings and links
//! rule = "#d4cfc4"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! # A denser appendix section
//! [pagination]
//! capacity = 650
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::measure::Measure;
use crate::paginate::{DEFAULT_HEADING_GUARD, PaginationPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Handbook configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandbookConfig {
    /// Path to the chapters directory (only meaningful at root level).
    #[serde(default = "default_chapters_root")]
    pub chapters_root: String,
    /// Title page and metadata.
    pub book: BookConfig,
    /// Page budget and break rules.
    pub pagination: PaginationConfig,
    /// Page geometry and spread layout.
    pub layout: LayoutConfig,
    /// Color scheme.
    pub colors: ColorConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

fn default_chapters_root() -> String {
    "chapters".to_string()
}

impl Default for HandbookConfig {
    fn default() -> Self {
        Self {
            chapters_root: default_chapters_root(),
            book: BookConfig::default(),
            pagination: PaginationConfig::default(),
            layout: LayoutConfig::default(),
            colors: ColorConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl HandbookConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pagination.validate()?;
        if !(1..=4).contains(&self.layout.columns) {
            return Err(ConfigError::Validation(
                "layout.columns must be 1-4".into(),
            ));
        }
        if self.book.title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "book.title must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Title page and book metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookConfig {
    pub title: String,
    /// Second line on the cover (e.g. the institution).
    pub subtitle: String,
    /// Small print under the subtitle.
    pub tagline: String,
    /// Edition shown on the cover and contents page.
    pub version: String,
    /// Image in the chapters root shown on the cover.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            title: "Handbook".to_string(),
            subtitle: String::new(),
            tagline: String::new(),
            version: "1.0.0".to_string(),
            cover_image: None,
        }
    }
}

/// Page budget and break rules. Resolved per section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    /// Maximum page size, in units of `measure`.
    pub capacity: usize,
    /// A heading arriving after this fraction of capacity starts a new page.
    pub heading_guard: f64,
    /// What a block's size counts.
    pub measure: Measure,
    /// Start every chapter on a fresh page.
    pub chapter_breaks: bool,
    /// Prepend the chapter title as a heading when the chapter lacks one.
    pub synthesize_titles: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            heading_guard: DEFAULT_HEADING_GUARD,
            measure: Measure::Words,
            chapter_breaks: true,
            synthesize_titles: true,
        }
    }
}

impl PaginationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Validation(
                "pagination.capacity must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.heading_guard) {
            return Err(ConfigError::Validation(
                "pagination.heading_guard must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }

    /// The pager policy these settings describe.
    pub fn to_policy(&self) -> PaginationPolicy {
        PaginationPolicy::new(self.capacity)
            .with_heading_guard(self.heading_guard)
            .with_measure(self.measure)
    }
}

/// Page geometry and spread layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Show two pages side by side. When false, one page per view.
    pub spreads: bool,
    /// Page width (CSS length, also used for print).
    pub page_width: String,
    /// Page height (CSS length, also used for print).
    pub page_height: String,
    /// Text columns per page.
    pub columns: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spreads: true,
            page_width: "8.5in".to_string(),
            page_height: "11in".to_string(),
            columns: 3,
        }
    }
}

/// Book color scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    /// Background behind the book.
    pub desk: String,
    /// Paper color.
    pub page: String,
    /// Cover board color.
    pub cover: String,
    /// Text on the cover.
    pub cover_text: String,
    /// Body text.
    pub text: String,
    /// Page numbers and running heads.
    pub text_muted: String,
    /// Headings and links.
    pub accent: String,
    /// Horizontal rules and column dividers.
    pub rule: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            desk: "#1a1a1a".to_string(),
            page: "#faf8f3".to_string(),
            cover: "#3d2817".to_string(),
            cover_text: "#e8e6e1".to_string(),
            text: "#2c2c2c".to_string(),
            text_muted: "#6b6b6b".to_string(),
            accent: "#8b4513".to_string(),
            rule: "#d4cfc4".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of chapters paginated in parallel.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(HandbookConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
///
/// Used to resolve a fully-merged config at any point in the directory hierarchy.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<HandbookConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: HandbookConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. The merged value is returned too, as the base
/// that section configs below `root` are merged onto.
pub fn load_config(root: &Path) -> Result<(HandbookConfig, toml::Value), ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config = resolve_config(merged.clone(), None)?;
    Ok((config, merged))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Config files can be placed at any level of the chapters tree:
#   chapters/config.toml                    -> root (overrides stock defaults)
#   chapters/020-policies/config.toml       -> section (overrides root)
#   chapters/020-policies/030-forms/config.toml -> subsection (overrides section)
#
# Sections only honor [pagination]; everything else is read from the root.
# Each level only needs the keys it wants to override.
# Unknown keys will cause an error.

# Path to chapters directory (only meaningful at root level)
chapters_root = "chapters"

# ---------------------------------------------------------------------------
# Book metadata (cover and contents page)
# ---------------------------------------------------------------------------
[book]
title = "Handbook"
subtitle = ""
tagline = ""
version = "1.0.0"

# Image file in the chapters root to show on the cover.
# cover_image = "cover.png"

# ---------------------------------------------------------------------------
# Pagination
# ---------------------------------------------------------------------------
[pagination]
# Page budget, in units of `measure`.
capacity = 500

# A heading arriving after this fraction of a page is full starts a new page,
# so section titles are never stranded at the bottom. 1.0 disables the guard.
heading_guard = 0.7

# "words" counts words of visible text.
# "chars" counts characters of rendered HTML (markup included).
measure = "words"

# Start every chapter on a fresh page. When false, chapters flow into each
# other under the root pagination settings.
chapter_breaks = true

# Add the chapter title (from the filename) as a level-1 heading when the
# chapter does not already open with it.
synthesize_titles = true

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
[layout]
# Two pages side by side like an open book. false = one page per view.
spreads = true

# Page size (CSS lengths). Also used for the print document.
page_width = "8.5in"
page_height = "11in"

# Text columns per page (1-4).
columns = 3

# ---------------------------------------------------------------------------
# Colors
# ---------------------------------------------------------------------------
[colors]
desk = "#1a1a1a"          # Behind the book
page = "#faf8f3"
cover = "#3d2817"
cover_text = "#e8e6e1"
text = "#2c2c2c"
text_muted = "#6b6b6b"    # Page numbers, running heads
accent = "#8b4513"        # Headings and links
rule = "#d4cfc4"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum chapters paginated in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-desk: {desk};
    --color-page: {page};
    --color-cover: {cover};
    --color-cover-text: {cover_text};
    --color-text: {text};
    --color-text-muted: {text_muted};
    --color-accent: {accent};
    --color-rule: {rule};
}}"#,
        desk = colors.desk,
        page = colors.page,
        cover = colors.cover,
        cover_text = colors.cover_text,
        text = colors.text,
        text_muted = colors.text_muted,
        accent = colors.accent,
        rule = colors.rule,
    )
}

/// Generate CSS custom properties and the print page box from layout config.
pub fn generate_layout_css(layout: &LayoutConfig) -> String {
    format!(
        r#":root {{
    --page-width: {width};
    --page-height: {height};
    --page-columns: {columns};
}}

@page {{
    size: {width} {height};
    margin: 0;
}}"#,
        width = layout.page_width,
        height = layout.page_height,
        columns = layout.columns,
    )
}
