//! Shared types used across all pipeline stages.
//!
//! These types are serialized to JSON between stages (scan → paginate →
//! generate) and must be identical across all three modules.

use serde::{Deserialize, Serialize};

/// Table of contents entry.
///
/// Sections (directories) have children and no chapter; chapters are leaves.
/// The scan stage leaves `page` empty; the paginate stage fills it with the
/// book page number the chapter starts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    /// Path relative to the chapters root.
    pub path: String,
    /// Index into the manifest's chapter list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<usize>,
    /// First page of the chapter, once paginated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntry>,
}
