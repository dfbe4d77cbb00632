//! Stateless normalization helpers shared by the extractors
//!
//! Everything here is a pure function over borrowed text. Failure is always
//! expressed as a default value (`None`, `0.0`, empty string), never as an
//! error, so the extractors can lean on these without branching.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)/10").expect("score pattern"));

/// Rewrite `url` to an absolute form against `origin`.
///
/// Scheme-prefixed input is returned unchanged, which makes the function
/// idempotent; re-absolutizing an already-absolute URL is a no-op. Empty
/// input stays empty.
pub fn absolutize(url: &str, origin: &str) -> String {
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    if url.starts_with('/') {
        format!("{origin}{url}")
    } else {
        format!("{origin}/{url}")
    }
}

/// Try each format in order and return the first date that parses.
///
/// Unparseable input yields `None` rather than an error; the caller decides
/// what an absent date means.
pub fn parse_flexible_date(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Remove duplicate tags under value equality, keeping first-occurrence
/// order.
pub fn dedup_preserve_order(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// Pull the numeric part out of a `"<float>/10"` score label.
///
/// Absence of the pattern yields `0.0`, never an error.
pub fn extract_score(label: &str) -> f64 {
    SCORE_RE
        .captures(label)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0.0)
}

/// Derive the record id from a URL by locating the `WLB-` marker.
///
/// The id runs from the marker to the next `/` (or the end of the string).
/// URLs without the marker yield an empty id.
pub fn extract_wlb_id(url: &str) -> String {
    let Some(idx) = url.find("WLB-") else {
        return String::new();
    };
    let tail = &url[idx..];
    match tail.find('/') {
        Some(slash) => tail[..slash].to_string(),
        None => tail.to_string(),
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
///
/// Text collected from HTML elements keeps the source's newlines and
/// indentation; label matching wants one canonical form.
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
