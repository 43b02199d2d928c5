//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod count;
pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Strip markup tags and decode HTML entities from upstream text runs
pub fn clean_text(text: &str) -> String {
    static HTML_TAG_RE: OnceLock<Regex> = OnceLock::new();

    let re = HTML_TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid regex pattern"));

    let no_tags = re.replace_all(text, "");
    let decoded = html_escape::decode_html_entities(&no_tags);
    decoded.trim().to_string()
}
