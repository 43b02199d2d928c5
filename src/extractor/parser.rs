//! Paginated-response parsing
//!
//! One response from the comments endpoint can carry the same logical
//! records in two encodings that are not mutually exclusive:
//!
//! 1. **Legacy** thread records (`commentThreadRenderer` /
//!    `commentRenderer`), nested under either a reload command (initial
//!    load) or an append action (subsequent pages). Each thread yields one
//!    comment plus, optionally, a nested reply-continuation pointer.
//! 2. **Entity** records (`commentEntityPayload`), delivered as a flat
//!    mutation batch elsewhere in the same response; they may duplicate a
//!    subset of (1) verbatim.
//!
//! The reconciliation rule: parse (1) first, build its id set, then parse
//! (2) skipping every id already seen; (2) is strictly additive. A record
//! without a resolvable author is dropped; a page whose top-level shape is
//! unrecognized yields zero comments and zero tokens, never an error.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::models::{Comment, CommentKind, VideoMetadata};
use crate::utils::clean_text;
use crate::utils::count::{decode_count, decode_count_from_label, decode_vote_count};

/// Everything extracted from one response page
#[derive(Debug, Default)]
pub struct ParsedPage {
    /// Canonical records, legacy-format order first, entities appended
    pub comments: Vec<Comment>,

    /// Token for the next page of this feed, if the response issued one
    pub next_token: Option<String>,

    /// Reply continuations discovered in this page, in discovery order
    pub reply_tokens: Vec<(String, String)>,
}

/// Parse one raw response page
///
/// `parent` is `None` for top-level pages; for reply pages it carries the
/// parent comment id every record on the page belongs to.
pub fn parse_comment_page(
    response: &Value,
    meta: &VideoMetadata,
    parent: Option<&str>,
) -> ParsedPage {
    let mut page = ParsedPage::default();
    let mut seen: HashSet<String> = HashSet::new();

    // Pass 1: legacy thread/comment renderers
    for item in continuation_items(response) {
        if let Some(thread) = item.get("commentThreadRenderer") {
            let renderer = thread.pointer("/comment/commentRenderer");
            if let Some(comment) = comment_from_renderer(renderer, meta, None) {
                if let Some(token) = reply_continuation_of_thread(thread) {
                    page.reply_tokens.push((comment.cid.clone(), token));
                }
                seen.insert(comment.cid.clone());
                page.comments.push(comment);
            }
        } else if let Some(renderer) = item.get("commentRenderer") {
            // Bare renderers appear on reply pages
            if let Some(comment) = comment_from_renderer(Some(renderer), meta, parent) {
                seen.insert(comment.cid.clone());
                page.comments.push(comment);
            }
        } else if let Some(token) = page_continuation_of_item(item) {
            page.next_token = Some(token);
        } else {
            trace!("Skipping unrecognized continuation item");
        }
    }

    // Pass 2: entity batch, strictly additive over pass 1
    let hearts = collect_toolbar_heart_states(response);
    for payload in entity_payloads(response) {
        let Some(comment) = comment_from_entity(payload, &hearts, meta, parent) else {
            continue;
        };
        if seen.contains(&comment.cid) {
            trace!(cid = %comment.cid, "Entity duplicates legacy record, skipping");
            continue;
        }
        seen.insert(comment.cid.clone());
        page.comments.push(comment);
    }

    debug!(
        comments = page.comments.len(),
        reply_tokens = page.reply_tokens.len(),
        has_next = page.next_token.is_some(),
        "Parsed comment page"
    );

    page
}

// ============================================================================
// Legacy format
// ============================================================================

/// All continuation items in the response, whichever wrapper they arrived
/// under. Initial loads use a reload command, later pages an append action;
/// both can appear across the endpoint list.
fn continuation_items(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .pointer("/onResponseReceivedEndpoints")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|endpoint| {
            endpoint
                .pointer("/reloadContinuationItemsCommand/continuationItems")
                .or_else(|| endpoint.pointer("/appendContinuationItemsAction/continuationItems"))
                .and_then(Value::as_array)
        })
        .flatten()
}

/// Build a canonical record from a legacy comment renderer
///
/// Returns `None` (record dropped) when the renderer is missing an id or a
/// resolvable author. Empty text is allowed.
fn comment_from_renderer(
    renderer: Option<&Value>,
    meta: &VideoMetadata,
    parent: Option<&str>,
) -> Option<Comment> {
    let renderer = renderer?;

    let cid = renderer.get("commentId")?.as_str()?.to_string();

    let author = renderer
        .pointer("/authorText/simpleText")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if author.is_empty() {
        trace!(cid = %cid, "Dropping record without author");
        return None;
    }

    let text = renderer
        .pointer("/contentText/runs")
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(|run| run.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .map(|joined| clean_text(&joined))
        .unwrap_or_default();

    let vote_count = decode_vote_count(
        renderer
            .pointer("/voteCount/simpleText")
            .and_then(Value::as_str),
    );

    let reply_count = renderer
        .get("replyCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let is_author_owner = renderer
        .get("authorIsChannelOwner")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let has_creator_heart = renderer
        .pointer("/actionButtons/commentActionButtonsRenderer/creatorHeart")
        .is_some();

    let relative_date = renderer
        .pointer("/publishedTimeText/runs/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kind = if parent.is_some() {
        CommentKind::Reply
    } else {
        CommentKind::Comment
    };

    Some(
        Comment {
            cid,
            text,
            author: author.to_string(),
            vote_count,
            reply_count,
            is_author_owner,
            has_creator_heart,
            kind,
            parent_cid: parent.map(str::to_string),
            relative_date,
            ..Default::default()
        }
        .with_metadata(meta),
    )
}

/// Reply continuation nested inside a thread record
///
/// The pointer has moved between layout versions: older responses put it
/// directly on the continuation item, newer ones behind a button command.
fn reply_continuation_of_thread(thread: &Value) -> Option<String> {
    let contents = thread
        .pointer("/replies/commentRepliesRenderer/contents")
        .and_then(Value::as_array)?;

    contents.iter().find_map(|item| {
        item.pointer("/continuationItemRenderer/continuationEndpoint/continuationCommand/token")
            .or_else(|| {
                item.pointer(
                    "/continuationItemRenderer/button/buttonRenderer/command/continuationCommand/token",
                )
            })
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

/// Page-level continuation token carried by a continuation item
///
/// Top-level pages issue it on the endpoint itself; reply pages hide it
/// behind a "show more" button.
fn page_continuation_of_item(item: &Value) -> Option<String> {
    item.pointer("/continuationItemRenderer/continuationEndpoint/continuationCommand/token")
        .or_else(|| {
            item.pointer(
                "/continuationItemRenderer/button/buttonRenderer/command/continuationCommand/token",
            )
        })
        .and_then(Value::as_str)
        .map(str::to_string)
}

// ============================================================================
// Entity format
// ============================================================================

fn entity_mutations(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .pointer("/frameworkUpdates/entityBatchUpdate/mutations")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn entity_payloads(response: &Value) -> impl Iterator<Item = &Value> {
    entity_mutations(response).filter_map(|m| m.pointer("/payload/commentEntityPayload"))
}

/// Heart state arrives as a separate toolbar-state mutation keyed by the
/// comment's toolbar state key.
fn collect_toolbar_heart_states(response: &Value) -> HashMap<String, bool> {
    entity_mutations(response)
        .filter_map(|m| {
            let payload = m.pointer("/payload/engagementToolbarStateEntityPayload")?;
            let key = payload.get("key")?.as_str()?.to_string();
            let hearted = payload
                .get("heartState")
                .and_then(Value::as_str)
                .is_some_and(|s| s == "TOOLBAR_HEART_STATE_HEARTED");
            Some((key, hearted))
        })
        .collect()
}

/// Build a canonical record from a flat entity payload
///
/// The vote count here is buried in a sentence-style accessibility label
/// rather than a bare count field.
fn comment_from_entity(
    payload: &Value,
    hearts: &HashMap<String, bool>,
    meta: &VideoMetadata,
    parent: Option<&str>,
) -> Option<Comment> {
    let cid = payload
        .pointer("/properties/commentId")?
        .as_str()?
        .to_string();

    let author = payload
        .pointer("/author/displayName")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if author.is_empty() {
        trace!(cid = %cid, "Dropping entity record without author");
        return None;
    }

    let text = payload
        .pointer("/properties/content/content")
        .and_then(Value::as_str)
        .map(clean_text)
        .unwrap_or_default();

    let vote_count = payload
        .pointer("/toolbar/likeCountA11y")
        .and_then(Value::as_str)
        .and_then(decode_count_from_label)
        .unwrap_or(0);

    let reply_count = payload
        .pointer("/toolbar/replyCount")
        .and_then(Value::as_str)
        .and_then(decode_count)
        .unwrap_or(0);

    let is_author_owner = payload
        .pointer("/author/isCreator")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let has_creator_heart = payload
        .pointer("/properties/toolbarStateKey")
        .and_then(Value::as_str)
        .and_then(|key| hearts.get(key).copied())
        .unwrap_or(false);

    let relative_date = payload
        .pointer("/properties/publishedTime")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kind = if parent.is_some() {
        CommentKind::Reply
    } else {
        CommentKind::Comment
    };

    Some(
        Comment {
            cid,
            text,
            author: author.to_string(),
            vote_count,
            reply_count,
            is_author_owner,
            has_creator_heart,
            kind,
            parent_cid: parent.map(str::to_string),
            relative_date,
            ..Default::default()
        }
        .with_metadata(meta),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> VideoMetadata {
        VideoMetadata {
            video_id: "dQw4w9WgXcQ".to_string(),
            original_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            canonical_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            title: "Test Video".to_string(),
            total_comments_count: Some(42),
        }
    }

    fn legacy_renderer(cid: &str, author: &str, text: &str) -> Value {
        serde_json::json!({
            "commentId": cid,
            "authorText": { "simpleText": author },
            "contentText": { "runs": [ { "text": text } ] },
            "voteCount": { "simpleText": "1.2K" },
            "replyCount": 3,
            "authorIsChannelOwner": false,
            "publishedTimeText": { "runs": [ { "text": "2 days ago" } ] }
        })
    }

    fn thread_item(cid: &str, author: &str, text: &str, reply_token: Option<&str>) -> Value {
        let mut thread = serde_json::json!({
            "commentThreadRenderer": {
                "comment": { "commentRenderer": legacy_renderer(cid, author, text) }
            }
        });
        if let Some(token) = reply_token {
            thread["commentThreadRenderer"]["replies"] = serde_json::json!({
                "commentRepliesRenderer": {
                    "contents": [
                        {
                            "continuationItemRenderer": {
                                "continuationEndpoint": {
                                    "continuationCommand": { "token": token }
                                }
                            }
                        }
                    ]
                }
            });
        }
        thread
    }

    fn reload_response(items: Vec<Value>) -> Value {
        serde_json::json!({
            "onResponseReceivedEndpoints": [
                { "reloadContinuationItemsCommand": { "continuationItems": items } }
            ]
        })
    }

    fn entity_mutation(cid: &str, author: &str, likes_label: &str) -> Value {
        serde_json::json!({
            "payload": {
                "commentEntityPayload": {
                    "properties": {
                        "commentId": cid,
                        "content": { "content": "entity text" },
                        "publishedTime": "1 week ago"
                    },
                    "author": { "displayName": author, "isCreator": false },
                    "toolbar": { "likeCountA11y": likes_label, "replyCount": "2" }
                }
            }
        })
    }

    #[test]
    fn test_legacy_thread_parsing() {
        let response = reload_response(vec![
            thread_item("c1", "alice", "first!", Some("reply-tok-1")),
            thread_item("c2", "bob", "second", None),
            serde_json::json!({
                "continuationItemRenderer": {
                    "continuationEndpoint": { "continuationCommand": { "token": "next-page" } }
                }
            }),
        ]);

        let page = parse_comment_page(&response, &meta(), None);

        assert_eq!(page.comments.len(), 2);
        assert_eq!(page.comments[0].cid, "c1");
        assert_eq!(page.comments[0].author, "alice");
        assert_eq!(page.comments[0].vote_count, 1200);
        assert_eq!(page.comments[0].reply_count, 3);
        assert_eq!(page.comments[0].kind, CommentKind::Comment);
        assert_eq!(page.comments[0].video_id, "dQw4w9WgXcQ");
        assert_eq!(page.comments[0].relative_date, "2 days ago");
        assert_eq!(page.next_token.as_deref(), Some("next-page"));
        assert_eq!(
            page.reply_tokens,
            vec![("c1".to_string(), "reply-tok-1".to_string())]
        );
    }

    #[test]
    fn test_append_wrapper_also_recognized() {
        let response = serde_json::json!({
            "onResponseReceivedEndpoints": [
                {
                    "appendContinuationItemsAction": {
                        "continuationItems": [ thread_item("c9", "carol", "later page", None) ]
                    }
                }
            ]
        });

        let page = parse_comment_page(&response, &meta(), None);
        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].cid, "c9");
    }

    #[test]
    fn test_entity_duplicate_skipped_legacy_wins() {
        let mut response = reload_response(vec![thread_item("c1", "alice", "legacy text", None)]);
        response["frameworkUpdates"] = serde_json::json!({
            "entityBatchUpdate": {
                "mutations": [ entity_mutation("c1", "alice-entity", "999 likes") ]
            }
        });

        let page = parse_comment_page(&response, &meta(), None);

        assert_eq!(page.comments.len(), 1);
        // Legacy field values preferred
        assert_eq!(page.comments[0].author, "alice");
        assert_eq!(page.comments[0].text, "legacy text");
        assert_eq!(page.comments[0].vote_count, 1200);
    }

    #[test]
    fn test_entity_additive_for_new_ids() {
        let mut response = reload_response(vec![thread_item("c1", "alice", "legacy", None)]);
        response["frameworkUpdates"] = serde_json::json!({
            "entityBatchUpdate": {
                "mutations": [ entity_mutation("c2", "dave", "1.2K Likes") ]
            }
        });

        let page = parse_comment_page(&response, &meta(), None);

        assert_eq!(page.comments.len(), 2);
        assert_eq!(page.comments[1].cid, "c2");
        assert_eq!(page.comments[1].author, "dave");
        assert_eq!(page.comments[1].vote_count, 1200);
        assert_eq!(page.comments[1].reply_count, 2);
    }

    #[test]
    fn test_entity_heart_state_resolved() {
        let response = serde_json::json!({
            "frameworkUpdates": {
                "entityBatchUpdate": {
                    "mutations": [
                        {
                            "payload": {
                                "commentEntityPayload": {
                                    "properties": {
                                        "commentId": "c3",
                                        "content": { "content": "hearted" },
                                        "toolbarStateKey": "state-key-3"
                                    },
                                    "author": { "displayName": "eve" },
                                    "toolbar": { "likeCountA11y": "5 likes" }
                                }
                            }
                        },
                        {
                            "payload": {
                                "engagementToolbarStateEntityPayload": {
                                    "key": "state-key-3",
                                    "heartState": "TOOLBAR_HEART_STATE_HEARTED"
                                }
                            }
                        }
                    ]
                }
            }
        });

        let page = parse_comment_page(&response, &meta(), None);
        assert_eq!(page.comments.len(), 1);
        assert!(page.comments[0].has_creator_heart);
        assert_eq!(page.comments[0].vote_count, 5);
    }

    #[test]
    fn test_authorless_record_dropped_not_fatal() {
        let mut no_author = thread_item("c1", "", "orphan", None);
        no_author["commentThreadRenderer"]["comment"]["commentRenderer"]["authorText"] =
            serde_json::json!({ "simpleText": "" });

        let response = reload_response(vec![
            no_author,
            thread_item("c2", "bob", "kept", None),
        ]);

        let page = parse_comment_page(&response, &meta(), None);
        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].cid, "c2");
    }

    #[test]
    fn test_empty_text_allowed() {
        let response = reload_response(vec![thread_item("c1", "alice", "", None)]);
        let page = parse_comment_page(&response, &meta(), None);
        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].text, "");
    }

    #[test]
    fn test_reply_page_tags_parent_and_kind() {
        let response = serde_json::json!({
            "onResponseReceivedEndpoints": [
                {
                    "appendContinuationItemsAction": {
                        "continuationItems": [
                            { "commentRenderer": legacy_renderer("r1", "frank", "a reply") },
                            {
                                "continuationItemRenderer": {
                                    "button": {
                                        "buttonRenderer": {
                                            "command": { "continuationCommand": { "token": "more-replies" } }
                                        }
                                    }
                                }
                            }
                        ]
                    }
                }
            ]
        });

        let page = parse_comment_page(&response, &meta(), Some("c1"));

        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].kind, CommentKind::Reply);
        assert_eq!(page.comments[0].parent_cid.as_deref(), Some("c1"));
        assert_eq!(page.next_token.as_deref(), Some("more-replies"));
    }

    #[test]
    fn test_unrecognized_shape_yields_empty_page() {
        let response = serde_json::json!({ "something": "else entirely" });
        let page = parse_comment_page(&response, &meta(), None);
        assert!(page.comments.is_empty());
        assert!(page.next_token.is_none());
        assert!(page.reply_tokens.is_empty());
    }

    #[test]
    fn test_multi_run_text_joined_and_cleaned() {
        let mut item = thread_item("c1", "alice", "", None);
        item["commentThreadRenderer"]["comment"]["commentRenderer"]["contentText"] =
            serde_json::json!({
                "runs": [
                    { "text": "part one " },
                    { "text": "&amp; part two" }
                ]
            });

        let response = reload_response(vec![item]);
        let page = parse_comment_page(&response, &meta(), None);
        assert_eq!(page.comments[0].text, "part one & part two");
    }

    #[test]
    fn test_owner_and_heart_flags_from_legacy() {
        let mut item = thread_item("c1", "creator", "own video", None);
        {
            let renderer =
                &mut item["commentThreadRenderer"]["comment"]["commentRenderer"];
            renderer["authorIsChannelOwner"] = serde_json::json!(true);
            renderer["actionButtons"] = serde_json::json!({
                "commentActionButtonsRenderer": { "creatorHeart": {} }
            });
        }

        let response = reload_response(vec![item]);
        let page = parse_comment_page(&response, &meta(), None);
        assert!(page.comments[0].is_author_owner);
        assert!(page.comments[0].has_creator_heart);
    }
}
