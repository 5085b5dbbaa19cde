//! Section, list, and labeled-field extraction.
//!
//! Model replies are free text that usually, but not always, follow the
//! requested layout. These helpers recover as much structure as they can and
//! document what they fall back to when the layout is absent.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// List items with this many characters or fewer are treated as noise.
pub const MIN_ITEM_LEN: usize = 5;

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s*(.+?)\s*$").expect("valid numbered item regex"));

static BULLET_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*•]\s+(.+?)\s*$").expect("valid bullet item regex"));

static MARKED_SUBHEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:H3:|###)\s*(.+?)\s*$").expect("valid subheading regex"));

static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(#{1,6})\s+(.+?)\s*#*\s*$").expect("valid heading regex"));

static SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:OVERALL SCORE|SCORE)[\s\S]*?(\d+(?:\.\d+)?)").expect("valid score regex")
});

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)").expect("valid number regex"));

/// Extract the body of a section that starts at `header`.
///
/// The header is matched case-insensitively anywhere in the text (bold markers
/// around it are tolerated). The body runs until the earliest of `end_headers`
/// found after the header, or to the end of the text. Returns `None` when the
/// header is absent; a present header with nothing after it yields `Some("")`.
pub fn extract_section(text: &str, header: &str, end_headers: &[&str]) -> Option<String> {
    let (_, header_end) = find_marker(text, header, 0)?;

    let body_start = skip_header_residue(text, header_end);
    let body_end = end_headers
        .iter()
        .filter_map(|end| find_marker(text, end, body_start))
        .map(|(start, _)| start)
        .min()
        .unwrap_or(text.len());

    Some(trim_trailing_residue(&text[body_start..body_end]).to_string())
}

/// Parse a numbered list (`1. item`, `2) item`).
///
/// Falls back to bullet items when no numbered item survives filtering.
/// Items are trimmed, stripped of bold markers, and dropped when they are not
/// longer than [`MIN_ITEM_LEN`] characters.
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    let items = collect_items(text, &NUMBERED_ITEM);
    if items.is_empty() {
        return parse_bullet_list(text);
    }
    items
}

/// Parse a bullet list (`-`, `*` or `•` followed by whitespace).
pub fn parse_bullet_list(text: &str) -> Vec<String> {
    collect_items(text, &BULLET_ITEM)
}

/// Extract a `LABEL: value` field.
///
/// Accepts `LABEL: value`, `**LABEL:** value` and `**LABEL**: value`, matching
/// the label case-insensitively on word boundaries. Only the rest of the line
/// is captured. Surrounding quotes and bold markers are removed; an empty value
/// counts as absent.
pub fn extract_labeled_field(text: &str, label: &str) -> Option<String> {
    let pattern =
        format!(r"(?i)\**\b{}\b\**[ \t]*:[ \t]*\**[ \t]*(.+)", regex::escape(label));
    let re = Regex::new(&pattern).ok()?;

    let value = re
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| clean_item(m.as_str()))
        .find(|value| !value.is_empty());
    value
}

/// Extract markdown headings of exactly `level` (`2` for `##`).
pub fn extract_headings(text: &str, level: usize) -> Vec<String> {
    text.lines()
        .filter_map(|line| HEADING_LINE.captures(line))
        .filter(|caps| caps.get(1).map(|m| m.as_str().len()) == Some(level))
        .filter_map(|caps| caps.get(2).map(|m| clean_item(m.as_str())))
        .filter(|heading| !heading.is_empty())
        .collect()
}

/// Extract a 0-10 review score.
///
/// Prefers an `OVERALL SCORE:` field, then the first number following any
/// `SCORE` mention. Values outside 0-10 are rejected.
pub fn extract_score(text: &str) -> Option<f64> {
    let labeled = extract_labeled_field(text, "OVERALL SCORE")
        .and_then(|value| LEADING_NUMBER.captures(&value).and_then(|c| c[1].parse::<f64>().ok()));

    labeled
        .or_else(|| SCORE.captures(text).and_then(|c| c[1].parse::<f64>().ok()))
        .filter(|score| (0.0..=10.0).contains(score))
}

/// Find the option number chosen on a line mentioning one of `labels`.
///
/// Used for replies like `SELECTED INTRODUCTION: Option 2`. Only digits on the
/// same line as the label are considered.
pub fn extract_choice_number(text: &str, labels: &[&str]) -> Option<usize> {
    if labels.is_empty() {
        return None;
    }

    let alternatives = labels.iter().map(|l| regex::escape(l)).collect::<Vec<_>>().join("|");
    let re = Regex::new(&format!(r"(?i)\b(?:{alternatives})\b[^\d\n]*(\d+)")).ok()?;

    let choice = re.captures_iter(text).find_map(|caps| caps[1].parse().ok());
    choice
}

/// Extract candidate subheadings from the text written under one heading.
///
/// Tries numbered items, then bullets, then `H3:`/`###` markers; the first
/// pattern that yields anything wins. Items that merely talk about "H3s"
/// (e.g. "No H3 needed here") are discarded. No cap is applied here.
pub fn extract_subheadings(section: &str) -> Vec<String> {
    let keep = |item: &String| !item.to_lowercase().contains("h3");

    let numbered: Vec<String> =
        collect_items(section, &NUMBERED_ITEM).into_iter().filter(keep).collect();
    if !numbered.is_empty() {
        return numbered;
    }

    let bullets: Vec<String> =
        collect_items(section, &BULLET_ITEM).into_iter().filter(keep).collect();
    if !bullets.is_empty() {
        return bullets;
    }

    section
        .lines()
        .filter_map(|line| MARKED_SUBHEADING.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| clean_item(m.as_str())))
        .filter(|item| item.chars().count() > MIN_ITEM_LEN)
        .filter(keep)
        .collect()
}

fn collect_items(text: &str, pattern: &Regex) -> Vec<String> {
    text.lines()
        .filter_map(|line| pattern.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| clean_item(m.as_str())))
        .filter(|item| item.chars().count() > MIN_ITEM_LEN)
        .collect()
}

fn clean_item(raw: &str) -> String {
    raw.replace("**", "").trim().trim_matches('"').trim().to_string()
}

fn find_marker(text: &str, marker: &str, from: usize) -> Option<(usize, usize)> {
    let pattern = format!(r"(?:\*\*)?{}", regex::escape(marker));
    let re = RegexBuilder::new(&pattern).case_insensitive(true).build().ok()?;
    re.find_at(text, from).map(|m| (m.start(), m.end()))
}

/// Skip the decoration left on a header line (`**`, `:`, `#`), or the whole
/// line when nothing else is on it.
fn skip_header_residue(text: &str, header_end: usize) -> usize {
    let rest = &text[header_end..];
    let line_len = rest.find('\n').unwrap_or(rest.len());
    let line = &rest[..line_len];

    if line.trim_matches(|c: char| "*:#-=_() ".contains(c)).is_empty() {
        return header_end + line_len;
    }

    let residue = line.len() - line.trim_start_matches(|c: char| c == '*' || c == ':').len();
    header_end + residue
}

/// Drop lines left dangling before the next header, such as `## 3.` or `**`.
fn trim_trailing_residue(body: &str) -> &str {
    let mut body = body.trim();
    loop {
        let (head, last) = match body.rfind('\n') {
            Some(pos) => (&body[..pos], &body[pos + 1..]),
            None => ("", body),
        };
        let last = last.trim();
        let markup_only = !last.is_empty()
            && last.chars().all(|c| "#*-=_.):0123456789 \t".contains(c))
            && last.chars().any(|c| "#*.)".contains(c));
        if !markup_only {
            return body;
        }
        body = head.trim();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRAINSTORM: &str = "Here are my ideas.\n\n\
**MAIN H2 HEADINGS:**\n\
1. Why Listening Beats Talking\n\
2. **The Science of Play**\n\
3. Ok\n\
\n\
**INTRODUCTION OPTIONS:**\n\
1. Open with a personal story\n\
2. Start with a surprising statistic\n\
\n\
CONCLUSION OPTIONS\n\
- End with a call to action\n\
- Circle back to the opening story\n";

    #[test]
    fn test_extract_section_between_headers() {
        let section =
            extract_section(BRAINSTORM, "MAIN H2 HEADINGS", &["INTRODUCTION OPTIONS"]).unwrap();
        assert!(section.starts_with("1. Why Listening"));
        assert!(!section.contains("INTRODUCTION"));
    }

    #[test]
    fn test_extract_section_runs_to_end() {
        let section = extract_section(BRAINSTORM, "conclusion options", &[]).unwrap();
        assert!(section.contains("call to action"));
        assert!(section.ends_with("opening story"));
    }

    #[test]
    fn test_extract_section_missing_header() {
        assert!(extract_section(BRAINSTORM, "FAQ IDEAS", &["CONCLUSION OPTIONS"]).is_none());
    }

    #[test]
    fn test_extract_section_ignores_end_header_before_start() {
        let text = "B SECTION\nstuff\nA SECTION\nbody text";
        let section = extract_section(text, "A SECTION", &["B SECTION"]).unwrap();
        assert_eq!(section, "body text");
    }

    #[test]
    fn test_extract_section_keeps_inline_content() {
        let text = "TITLE: Improv at Work\nOTHER: x";
        let section = extract_section(text, "TITLE", &["OTHER"]).unwrap();
        assert_eq!(section, "Improv at Work");
    }

    #[test]
    fn test_extract_section_drops_dangling_numbering() {
        let text = "## 1. FINAL BLOG POST\n\n# Title\n\nBody text.\n\n## 2. METADATA SUMMARY\n- 8";
        let section = extract_section(text, "FINAL BLOG POST", &["METADATA SUMMARY"]).unwrap();
        assert_eq!(section, "# Title\n\nBody text.");
    }

    #[test]
    fn test_parse_numbered_list_filters_short_items() {
        let section =
            extract_section(BRAINSTORM, "MAIN H2 HEADINGS", &["INTRODUCTION OPTIONS"]).unwrap();
        let items = parse_numbered_list(&section);
        assert_eq!(items, vec!["Why Listening Beats Talking", "The Science of Play"]);
    }

    #[test]
    fn test_parse_numbered_list_falls_back_to_bullets() {
        let section = extract_section(BRAINSTORM, "CONCLUSION OPTIONS", &[]).unwrap();
        let items = parse_numbered_list(&section);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], "End with a call to action");
    }

    #[test]
    fn test_parse_numbered_list_paren_style() {
        let items = parse_numbered_list("1) First idea here\n2) Second idea here");
        assert_eq!(items, vec!["First idea here", "Second idea here"]);
    }

    #[test]
    fn test_parse_numbered_list_empty() {
        assert!(parse_numbered_list("no list at all").is_empty());
        assert!(parse_numbered_list("").is_empty());
    }

    #[test]
    fn test_bold_line_is_not_a_bullet() {
        assert!(parse_bullet_list("**Not a bullet item**").is_empty());
    }

    #[test]
    fn test_extract_labeled_field_variants() {
        assert_eq!(extract_labeled_field("TITLE: Plain", "TITLE").as_deref(), Some("Plain"));
        assert_eq!(
            extract_labeled_field("**TITLE:** \"Quoted Bold\"", "title").as_deref(),
            Some("Quoted Bold")
        );
        assert_eq!(
            extract_labeled_field("**KEYWORDS**: improv, teams", "KEYWORDS").as_deref(),
            Some("improv, teams")
        );
    }

    #[test]
    fn test_extract_labeled_field_word_boundary() {
        assert!(extract_labeled_field("SUBTITLE: nope", "TITLE").is_none());
        assert!(extract_labeled_field("TITLE:   \n", "TITLE").is_none());
    }

    #[test]
    fn test_extract_headings_exact_level() {
        let outline = "# Title\n## First Section\n### Detail\n## Second Section ##\n####Bad";
        assert_eq!(extract_headings(outline, 2), vec!["First Section", "Second Section"]);
        assert_eq!(extract_headings(outline, 3), vec!["Detail"]);
        assert_eq!(extract_headings(outline, 1), vec!["Title"]);
    }

    #[test]
    fn test_extract_score() {
        assert_eq!(extract_score("OVERALL SCORE: 8/10"), Some(8.0));
        assert_eq!(extract_score("**Overall Score:** 7.9"), Some(7.9));
        assert_eq!(extract_score("My score for this draft is 6"), Some(6.0));
        assert_eq!(extract_score("Looks great overall."), None);
        assert_eq!(extract_score("SCORE: 85"), None);
    }

    #[test]
    fn test_extract_choice_number() {
        let reply = "## Introduction\n\nSELECTED INTRODUCTION: Option 2 - story\nCONCLUSION: 3";
        assert_eq!(extract_choice_number(reply, &["INTRODUCTION", "INTRO"]), Some(2));
        assert_eq!(extract_choice_number(reply, &["CONCLUSION"]), Some(3));
        assert_eq!(extract_choice_number(reply, &["FAQ"]), None);
        assert_eq!(extract_choice_number(reply, &[]), None);
    }

    #[test]
    fn test_extract_subheadings_prefers_numbered() {
        let section = "1. Reading the room\n- a bullet that loses\n2. Saying yes, and";
        assert_eq!(extract_subheadings(section), vec!["Reading the room", "Saying yes, and"]);
    }

    #[test]
    fn test_extract_subheadings_marked() {
        let section = "H3: Building trust fast\n### Holding the space";
        assert_eq!(extract_subheadings(section), vec!["Building trust fast", "Holding the space"]);
    }

    #[test]
    fn test_extract_subheadings_drops_meta_items() {
        let section = "- No H3s needed for this one\n";
        assert!(extract_subheadings(section).is_empty());
    }
}
