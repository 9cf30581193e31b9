//! Question Parser - pulls discrete questions out of free-form model output.
//!
//! Two independent passes:
//! 1. `parse_marked`: lines that start with a list marker (digits, periods,
//!    parentheses, hyphens, asterisks) followed by whitespace.
//! 2. `parse_plain`: every non-blank line, used only when pass 1 finds nothing.
//!
//! Pass 2 may admit prose sentences as questions. The generation prompt asks
//! the model for list output only, so this is tolerated.

use std::sync::OnceLock;

use regex::Regex;

fn list_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"^\s*[\d.)*\-]+\s+").expect("Invalid list marker regex"))
}

/// Parses questions, falling back to plain lines when no list markers are found.
/// An empty result means the output held nothing usable.
pub fn parse_questions(raw: &str) -> Vec<String> {
    let marked = parse_marked(raw);
    if marked.is_empty() {
        parse_plain(raw)
    } else {
        marked
    }
}

/// Strict pass: marker-prefixed lines with the marker stripped.
pub fn parse_marked(raw: &str) -> Vec<String> {
    let marker = list_marker();
    raw.trim()
        .lines()
        .filter_map(|line| marker.find(line).map(|m| line[m.end()..].trim()))
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

/// Permissive pass: every non-blank line, trimmed.
pub fn parse_plain(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
