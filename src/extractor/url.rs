//! URL normalization for video references
//!
//! This module validates and canonicalizes the URL shapes the platform uses
//! for one and the same video:
//! - Canonical watch: `https://www.youtube.com/watch?v={id}`
//! - Short link: `https://youtu.be/{id}`
//! - Shorts: `https://www.youtube.com/shorts/{id}`
//! - Embed: `https://www.youtube.com/embed/{id}`
//!
//! All four carry the same 11-character id; the canonical form is always
//! the watch shape regardless of input shape.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::utils::error::ParseError;

/// Hosts that serve watch/shorts/embed URLs
const PLATFORM_HOSTS: &[&str] = &[
    "www.youtube.com",
    "youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Host of the short-link shape
const SHORT_LINK_HOST: &str = "youtu.be";

/// The opaque video id: exactly 11 URL-safe base64 characters
static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Result of normalizing one video reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub is_valid: bool,
    pub video_id: Option<String>,
    pub canonical_url: Option<String>,
    pub error: Option<String>,
}

impl NormalizedUrl {
    fn valid(video_id: String) -> Self {
        let canonical = canonical_watch_url(&video_id);
        Self {
            is_valid: true,
            video_id: Some(video_id),
            canonical_url: Some(canonical),
            error: None,
        }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            video_id: None,
            canonical_url: None,
            error: Some(error.into()),
        }
    }
}

/// Build the canonical watch URL for a video id
pub fn canonical_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Check whether a string is a well-formed video id
pub fn is_video_id(candidate: &str) -> bool {
    VIDEO_ID_REGEX.is_match(candidate)
}

/// Normalize a single video reference
///
/// Accepts any of the four recognized URL shapes (scheme optional) or a bare
/// 11-character id. Never panics; malformed input comes back as an invalid
/// [`NormalizedUrl`] with a message that distinguishes "wrong host" from
/// "right host, no parseable id".
pub fn normalize(input: &str) -> NormalizedUrl {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return NormalizedUrl::invalid("empty URL");
    }

    // A bare id is accepted as-is
    if is_video_id(trimmed) {
        return NormalizedUrl::valid(trimmed.to_string());
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = match Url::parse(&with_scheme) {
        Ok(u) => u,
        Err(_) => return NormalizedUrl::invalid(format!("unparseable URL: {trimmed}")),
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return NormalizedUrl::invalid(format!("unsupported scheme: {}", parsed.scheme()));
    }

    let host = match parsed.host_str() {
        Some(h) => h,
        None => return NormalizedUrl::invalid(format!("URL has no host: {trimmed}")),
    };

    if host == SHORT_LINK_HOST {
        return match first_path_segment(&parsed) {
            Some(id) if is_video_id(id) => NormalizedUrl::valid(id.to_string()),
            _ => NormalizedUrl::invalid(format!("no video id in short link: {trimmed}")),
        };
    }

    if !PLATFORM_HOSTS.contains(&host) {
        return NormalizedUrl::invalid(format!("not a supported video host: {host}"));
    }

    match extract_id_from_platform_url(&parsed) {
        Ok(id) => NormalizedUrl::valid(id),
        Err(_) => NormalizedUrl::invalid(format!("no video id found in URL: {trimmed}")),
    }
}

/// Extract a video id from a platform-host URL, any recognized shape
pub fn extract_video_id(input: &str) -> Result<String, ParseError> {
    let normalized = normalize(input);
    normalized.video_id.ok_or(ParseError::IdExtractionFailed)
}

fn extract_id_from_platform_url(parsed: &Url) -> Result<String, ParseError> {
    let path = parsed.path();

    // Watch shape: id in the v query parameter, any position
    if path == "/watch" {
        if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
            if is_video_id(&v) {
                return Ok(v.into_owned());
            }
        }
        return Err(ParseError::IdExtractionFailed);
    }

    // Shorts and embed shapes: id is the segment after the prefix
    for prefix in ["/shorts/", "/embed/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            let id = rest.split('/').next().unwrap_or_default();
            if is_video_id(id) {
                return Ok(id.to_string());
            }
            return Err(ParseError::IdExtractionFailed);
        }
    }

    Err(ParseError::IdExtractionFailed)
}

fn first_path_segment(parsed: &Url) -> Option<&str> {
    parsed
        .path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Partition a list of references into valid and invalid, preserving order
///
/// Never panics; every input lands in exactly one of the two buckets.
pub fn normalize_batch(inputs: &[String]) -> (Vec<NormalizedUrl>, Vec<NormalizedUrl>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for input in inputs {
        let normalized = normalize(input);
        if normalized.is_valid {
            valid.push(normalized);
        } else {
            invalid.push(normalized);
        }
    }

    (valid, invalid)
}
