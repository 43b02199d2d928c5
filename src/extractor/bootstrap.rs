//! Landing-page bootstrap
//!
//! The watch page embeds a single initial-state JSON document whose markup
//! wrapper varies across layout versions. This module locates that document
//! by trying several equivalent embedding patterns in order, then extracts
//! the handful of fields the pipeline needs: title, declared comment count,
//! the first continuation token, and the comments-disabled flag.
//!
//! Every field is modeled as an ordered list of independently testable
//! extractor functions; the first success wins. The fetch itself is driven
//! by the pagination engine so it goes through the retry classifier like
//! every other network call.

use serde_json::Value;
use tracing::debug;

use crate::utils::count::decode_count;
use crate::utils::error::ParseError;
use crate::utils::normalize_whitespace;

/// Markers that introduce the embedded initial-state document, newest
/// layout first. The JSON object itself is recovered with a balanced-brace
/// scan starting right after the marker.
const INITIAL_DATA_MARKERS: &[&str] = &[
    "var ytInitialData = ",
    "window[\"ytInitialData\"] = ",
    "window.ytInitialData = ",
];

/// Panel identifier of the comments section in newer layouts
const COMMENTS_PANEL_ID: &str = "engagement-panel-comments-section";

/// Section identifier of the comments slot in the legacy layout
const COMMENTS_SECTION_ID: &str = "comment-item-section";

/// Everything the bootstrapper learns from one landing page
#[derive(Debug, Clone, Default)]
pub struct BootstrapData {
    pub title: String,
    pub total_comments_count: Option<u64>,
    pub continuation_token: Option<String>,
    pub comments_disabled: bool,
}

/// Parse a landing page into [`BootstrapData`]
///
/// # Errors
///
/// Returns [`ParseError::InitialDataNotFound`] when no embedding pattern
/// yields a parseable JSON document.
pub fn parse_landing_page(html: &str) -> Result<BootstrapData, ParseError> {
    let root = extract_initial_data(html)?;

    let data = BootstrapData {
        title: extract_title(&root)
            .map(|t| normalize_whitespace(&t))
            .unwrap_or_default(),
        total_comments_count: extract_comment_count(&root),
        continuation_token: extract_continuation_token(&root),
        comments_disabled: comments_disabled(&root),
    };

    debug!(
        title = %data.title,
        total = ?data.total_comments_count,
        has_token = data.continuation_token.is_some(),
        disabled = data.comments_disabled,
        "Parsed landing page"
    );

    Ok(data)
}

/// Locate and parse the embedded initial-state document
///
/// Tries each marker in order; for each hit, scans out the balanced JSON
/// object and attempts a parse. First successful parse wins.
pub fn extract_initial_data(html: &str) -> Result<Value, ParseError> {
    for marker in INITIAL_DATA_MARKERS {
        let Some(pos) = html.find(marker) else {
            continue;
        };
        let tail = &html[pos + marker.len()..];
        let Some(json_str) = balanced_json_object(tail) else {
            continue;
        };
        match serde_json::from_str::<Value>(json_str) {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(marker, error = %e, "Marker matched but JSON parse failed");
                continue;
            }
        }
    }

    Err(ParseError::InitialDataNotFound)
}

/// Slice out one balanced `{...}` object from the start of `text`
///
/// Tracks string literals and escapes so braces inside comment text do not
/// derail the scan.
fn balanced_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

// ============================================================================
// Field extractors (ordered, first success wins)
// ============================================================================

fn extract_title(root: &Value) -> Option<String> {
    let extractors: &[fn(&Value) -> Option<String>] = &[
        title_from_primary_info,
        title_from_video_details,
        title_from_player_overlay,
    ];
    extractors.iter().find_map(|f| f(root))
}

/// Primary-info renderer inside the watch results column
fn title_from_primary_info(root: &Value) -> Option<String> {
    watch_results_contents(root)?
        .iter()
        .find_map(|item| {
            item.pointer("/videoPrimaryInfoRenderer/title/runs/0/text")
                .and_then(Value::as_str)
        })
        .map(str::to_string)
}

fn title_from_video_details(root: &Value) -> Option<String> {
    root.pointer("/videoDetails/title")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn title_from_player_overlay(root: &Value) -> Option<String> {
    root.pointer(
        "/playerOverlays/playerOverlayRenderer/videoDetails/playerOverlayVideoDetailsRenderer/title/simpleText",
    )
    .and_then(Value::as_str)
    .map(str::to_string)
}

fn extract_comment_count(root: &Value) -> Option<u64> {
    let extractors: &[fn(&Value) -> Option<u64>] = &[
        count_from_engagement_panel,
        count_from_entry_point,
    ];
    extractors.iter().find_map(|f| f(root))
}

/// Count shown in the comments panel header ("Comments · 1.2K")
fn count_from_engagement_panel(root: &Value) -> Option<u64> {
    let panel = comments_engagement_panel(root)?;
    let text = panel
        .pointer("/engagementPanelSectionListRenderer/header/engagementPanelTitleHeaderRenderer/contextualInfo/runs/0/text")
        .and_then(Value::as_str)?;
    decode_count(text)
}

/// Count in the inline comments entry point of the legacy layout
fn count_from_entry_point(root: &Value) -> Option<u64> {
    comments_item_section(root)?
        .iter()
        .find_map(|item| {
            item.pointer("/commentsEntryPointHeaderRenderer/commentCount/simpleText")
                .and_then(Value::as_str)
        })
        .and_then(decode_count)
}

/// First continuation token: engagement panel first, then the legacy slot
///
/// Panels take priority because newer layouts relocate the token there and
/// may leave a stale one in the legacy slot.
fn extract_continuation_token(root: &Value) -> Option<String> {
    let extractors: &[fn(&Value) -> Option<String>] = &[
        token_from_engagement_panel,
        token_from_watch_results,
    ];
    extractors.iter().find_map(|f| f(root))
}

fn token_from_engagement_panel(root: &Value) -> Option<String> {
    let panel = comments_engagement_panel(root)?;
    let contents = panel
        .pointer("/engagementPanelSectionListRenderer/content/sectionListRenderer/contents")?
        .as_array()?;

    contents
        .iter()
        .filter_map(|section| {
            section
                .pointer("/itemSectionRenderer/contents")
                .and_then(Value::as_array)
        })
        .flatten()
        .find_map(continuation_token_of)
}

fn token_from_watch_results(root: &Value) -> Option<String> {
    comments_item_section(root)?
        .iter()
        .find_map(continuation_token_of)
}

fn continuation_token_of(item: &Value) -> Option<String> {
    item.pointer("/continuationItemRenderer/continuationEndpoint/continuationCommand/token")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Whether the landing page declares comments turned off
fn comments_disabled(root: &Value) -> bool {
    let Some(items) = comments_item_section(root) else {
        return false;
    };

    items.iter().any(|item| {
        item.pointer("/messageRenderer/text/runs/0/text")
            .and_then(Value::as_str)
            .is_some_and(|text| {
                let lower = text.to_lowercase();
                lower.contains("turned off") || lower.contains("disabled")
            })
    })
}

// ============================================================================
// Shared navigation helpers
// ============================================================================

fn watch_results_contents(root: &Value) -> Option<&Vec<Value>> {
    root.pointer("/contents/twoColumnWatchNextResults/results/results/contents")
        .and_then(Value::as_array)
}

fn comments_engagement_panel(root: &Value) -> Option<&Value> {
    root.pointer("/engagementPanels")?
        .as_array()?
        .iter()
        .find(|panel| {
            panel
                .pointer("/engagementPanelSectionListRenderer/panelIdentifier")
                .and_then(Value::as_str)
                == Some(COMMENTS_PANEL_ID)
        })
}

/// Items of the legacy comment-item-section, when present
fn comments_item_section(root: &Value) -> Option<&Vec<Value>> {
    watch_results_contents(root)?
        .iter()
        .find(|item| {
            item.pointer("/itemSectionRenderer/sectionIdentifier")
                .and_then(Value::as_str)
                == Some(COMMENTS_SECTION_ID)
        })?
        .pointer("/itemSectionRenderer/contents")
        .and_then(Value::as_array)
}
