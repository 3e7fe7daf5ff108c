//! Centralized filename parsing for the NNN-name convention.
//!
//! Chapters (`.md` files) and sections (directories) follow the same naming
//! pattern: an optional numeric prefix (`NNN-`) followed by a name. This
//! module provides a single parsing function that extracts every derived
//! form consistently.
//!
//! ## Display Titles
//!
//! Dashes and underscores in the name portion become spaces, and each word
//! is capitalized. A chapter without a leading `# Title` uses this as its
//! title:
//! - `020-office-hours.md` → "Office Hours"
//! - `030-Grading_and_Appeals/` → "Grading And Appeals"
//!
//! ## Slugs
//!
//! Slugs are lowercase ASCII with single dashes: `030-Grading_and_Appeals`
//! → `grading-and-appeals`. They key chapters in the paged book and must be
//! unique across the handbook.

use std::cmp::Ordering;

/// Result of parsing a numbered entry name like `020-office-hours`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Number prefix if present (e.g., `20` from `020-office-hours`)
    pub number: Option<u32>,
    /// Raw name part after `NNN-`. Empty if number-only.
    /// For unnumbered entries, this is the full input.
    pub name: String,
    /// Display title: words of the name, capitalized.
    pub display_title: String,
    /// URL-safe identifier derived from the name.
    pub slug: String,
}

/// Parse an entry name following the `NNN-name` convention.
///
/// Handles these patterns:
/// - `"020-office-hours"` → number=Some(20), name="office-hours", display_title="Office Hours"
/// - `"001"` → number=Some(1), name="", display_title=""
/// - `"001-"` → number=Some(1), name="", display_title=""
/// - `"appendix"` → number=None, name="appendix", display_title="Appendix"
pub fn parse_entry_name(name: &str) -> ParsedName {
    let (number, raw) = split_number(name);
    ParsedName {
        number,
        name: raw.to_string(),
        display_title: display_title(raw),
        slug: slugify(raw),
    }
}

fn split_number(name: &str) -> (Option<u32>, &str) {
    if let Some(dash_pos) = name.find('-')
        && let Ok(num) = name[..dash_pos].parse::<u32>()
    {
        return (Some(num), &name[dash_pos + 1..]);
    }
    match name.parse::<u32>() {
        Ok(num) => (Some(num), ""),
        Err(_) => (None, name),
    }
}

fn display_title(raw: &str) -> String {
    raw.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase ASCII alphanumerics separated by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Order entries by number prefix, then by name. Unnumbered entries sort last.
pub fn compare_entries(a: &str, b: &str) -> Ordering {
    let key = |s: &str| (split_number(s).0.unwrap_or(u32::MAX), s.to_string());
    key(a).cmp(&key(b))
}
