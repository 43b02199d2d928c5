//! Decoding of upstream count strings
//!
//! The platform renders rounded counts with magnitude suffixes ("1.2K",
//! "2.5M") in some places, comma-grouped integers in others, and sometimes
//! buries the number in a sentence-style accessibility label ("123 likes").
//! All call sites share this one decoder.

use regex::Regex;
use std::sync::LazyLock;

/// Matches a full count string: digits with optional grouping commas, an
/// optional fractional part, and an optional K/M/B suffix.
static COUNT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([\d,]+(?:\.\d+)?)\s*([KMB])?$").unwrap());

/// Finds the first count-shaped token inside a longer label.
static EMBEDDED_COUNT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?\s*[KMB]?)\b").unwrap());

/// Decode a count string into an integer
///
/// Returns `None` for empty or unparseable input; callers in a vote-count
/// context fold that to 0, callers in a metadata context keep the `None`.
///
/// # Examples
///
/// ```
/// use ytcomb::utils::count::decode_count;
///
/// assert_eq!(decode_count("1.2K"), Some(1200));
/// assert_eq!(decode_count("1,234"), Some(1234));
/// assert_eq!(decode_count(""), None);
/// ```
pub fn decode_count(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let caps = COUNT_REGEX.captures(trimmed)?;
    let number: f64 = caps
        .get(1)?
        .as_str()
        .replace(',', "")
        .parse()
        .ok()?;

    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(s) if s == "K" => 1_000.0,
        Some(s) if s == "M" => 1_000_000.0,
        Some(s) if s == "B" => 1_000_000_000.0,
        _ => 1.0,
    };

    Some((number * multiplier).round() as u64)
}

/// Decode the first count found inside a sentence-style label
///
/// Accessibility labels read like "123 likes" or "1.2K Likes"; this pulls
/// out the number and runs it through [`decode_count`].
pub fn decode_count_from_label(label: &str) -> Option<u64> {
    let token = EMBEDDED_COUNT_REGEX.find(label)?;
    decode_count(token.as_str())
}

/// Vote-count context: absent or unparseable means zero
pub fn decode_vote_count(text: Option<&str>) -> u64 {
    text.and_then(decode_count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_count_table() {
        assert_eq!(decode_count("234"), Some(234));
        assert_eq!(decode_count("1,234"), Some(1234));
        assert_eq!(decode_count("1.2K"), Some(1200));
        assert_eq!(decode_count("45K"), Some(45_000));
        assert_eq!(decode_count("2.5M"), Some(2_500_000));
        assert_eq!(decode_count("2B"), Some(2_000_000_000));
    }

    #[test]
    fn test_decode_count_case_insensitive() {
        assert_eq!(decode_count("1.2k"), Some(1200));
        assert_eq!(decode_count("2.5m"), Some(2_500_000));
        assert_eq!(decode_count("2b"), Some(2_000_000_000));
    }

    #[test]
    fn test_decode_count_empty_and_garbage() {
        assert_eq!(decode_count(""), None);
        assert_eq!(decode_count("   "), None);
        assert_eq!(decode_count("no comments"), None);
        assert_eq!(decode_count("K"), None);
    }

    #[test]
    fn test_decode_count_whitespace() {
        assert_eq!(decode_count(" 45K "), Some(45_000));
        assert_eq!(decode_count("45 K"), Some(45_000));
    }

    #[test]
    fn test_decode_count_from_label() {
        assert_eq!(decode_count_from_label("123 likes"), Some(123));
        assert_eq!(decode_count_from_label("1.2K Likes"), Some(1200));
        assert_eq!(decode_count_from_label("Reply with 45K likes"), Some(45_000));
        assert_eq!(decode_count_from_label("no likes here"), None);
    }

    #[test]
    fn test_decode_vote_count_defaults_to_zero() {
        assert_eq!(decode_vote_count(None), 0);
        assert_eq!(decode_vote_count(Some("")), 0);
        assert_eq!(decode_vote_count(Some("garbage")), 0);
        assert_eq!(decode_vote_count(Some("1.2K")), 1200);
    }
}
