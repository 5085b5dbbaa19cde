//! Text extraction and metrics for loosely-structured model output.
//!
//! Every function here is pure and best-effort: when the expected structure
//! is missing they return `None` or an empty list instead of failing.

mod metrics;
mod parse;

pub use metrics::{
    analyze_structure, format_duration, keyword_density, reading_time_minutes, slugify,
    split_keywords, word_count, KeywordDensity, StructureStats, OPTIMAL_DENSITY_RANGE,
    WORDS_PER_MINUTE,
};
pub use parse::{
    extract_choice_number, extract_headings, extract_labeled_field, extract_score,
    extract_section, extract_subheadings, parse_bullet_list, parse_numbered_list, MIN_ITEM_LEN,
};
