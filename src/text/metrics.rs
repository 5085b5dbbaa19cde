//! Word counts, reading time, keyword density, and document structure.

use serde::{Deserialize, Serialize};

/// Reading speed used for reading-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Keyword density band (percent) considered optimal.
pub const OPTIMAL_DENSITY_RANGE: (f64, f64) = (0.5, 2.5);

/// Maximum slug length.
const MAX_SLUG_LEN: usize = 50;

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in whole minutes, rounded up.
pub fn reading_time_minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}

/// Split a comma-separated keyword string into trimmed, non-empty keywords.
pub fn split_keywords(keywords: &str) -> Vec<String> {
    keywords.split(',').map(str::trim).filter(|k| !k.is_empty()).map(String::from).collect()
}

/// Density report for a single keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDensity {
    /// The keyword as supplied
    pub keyword: String,

    /// Case-insensitive occurrences in the text
    pub count: usize,

    /// Occurrences per hundred words
    pub density: f64,

    /// Whether the density falls in [`OPTIMAL_DENSITY_RANGE`]
    pub optimal: bool,
}

/// Compute keyword density for each keyword.
pub fn keyword_density(text: &str, keywords: &[String]) -> Vec<KeywordDensity> {
    let words = word_count(text);
    let lower = text.to_lowercase();

    keywords
        .iter()
        .map(|keyword| {
            let needle = keyword.to_lowercase();
            let count = if needle.is_empty() { 0 } else { lower.matches(&needle).count() };
            let density = if words == 0 { 0.0 } else { count as f64 / words as f64 * 100.0 };
            let (low, high) = OPTIMAL_DENSITY_RANGE;

            KeywordDensity {
                keyword: keyword.clone(),
                count,
                density,
                optimal: density >= low && density <= high,
            }
        })
        .collect()
}

/// Heading and paragraph statistics for a markdown document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureStats {
    pub h1_count: usize,
    pub h2_count: usize,
    pub h3_count: usize,
    pub paragraphs: usize,
    pub avg_words_per_paragraph: usize,
}

/// Count headings by level and prose paragraphs (blank-line separated blocks
/// that are not headings).
pub fn analyze_structure(text: &str) -> StructureStats {
    let mut stats = StructureStats::default();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("### ") {
            stats.h3_count += 1;
        } else if trimmed.starts_with("## ") {
            stats.h2_count += 1;
        } else if trimmed.starts_with("# ") {
            stats.h1_count += 1;
        }
    }

    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty() && !block.starts_with('#'))
        .collect();

    stats.paragraphs = paragraphs.len();
    if !paragraphs.is_empty() {
        let total: usize = paragraphs.iter().map(|p| word_count(p)).sum();
        stats.avg_words_per_paragraph = total / paragraphs.len();
    }

    stats
}

/// Make a URL/file-friendly slug: lowercase, word characters and hyphens
/// only, at most 50 characters, never ending in a hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
    }

    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let truncated = truncated.trim_end_matches('-');

    if truncated.is_empty() {
        "untitled".to_string()
    } else {
        truncated.to_string()
    }
}

/// Human-readable duration: `850ms`, `42s`, `3m 5s`.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        return format!("{ms}ms");
    }

    let seconds = ms / 1000;
    if seconds < 60 {
        return format!("{seconds}s");
    }

    format!("{}m {}s", seconds / 60, seconds % 60)
}
