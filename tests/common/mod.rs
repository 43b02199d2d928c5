//! Shared fixtures for integration tests
//!
//! Builders for landing pages and paginated responses in the shapes the
//! parser recognizes, kept small enough to compose per test.

use serde_json::{json, Value};

/// Build a landing page embedding an initial-data document
///
/// `token` lands in the engagement panel slot; `disabled` swaps the panel
/// for the legacy "turned off" message.
pub fn landing_page(title: &str, token: Option<&str>, count: &str, disabled: bool) -> String {
    let mut contents = vec![json!({
        "videoPrimaryInfoRenderer": {
            "title": { "runs": [ { "text": title } ] }
        }
    })];

    if disabled {
        contents.push(json!({
            "itemSectionRenderer": {
                "sectionIdentifier": "comment-item-section",
                "contents": [
                    {
                        "messageRenderer": {
                            "text": { "runs": [ { "text": "Comments are turned off. Learn more" } ] }
                        }
                    }
                ]
            }
        }));
    }

    let mut root = json!({
        "contents": {
            "twoColumnWatchNextResults": {
                "results": { "results": { "contents": contents } }
            }
        }
    });

    if let Some(token) = token {
        root["engagementPanels"] = json!([
            {
                "engagementPanelSectionListRenderer": {
                    "panelIdentifier": "engagement-panel-comments-section",
                    "header": {
                        "engagementPanelTitleHeaderRenderer": {
                            "contextualInfo": { "runs": [ { "text": count } ] }
                        }
                    },
                    "content": {
                        "sectionListRenderer": {
                            "contents": [
                                {
                                    "itemSectionRenderer": {
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
                                }
                            ]
                        }
                    }
                }
            }
        ]);
    }

    format!(
        "<html><head><script>var ytInitialData = {root};</script></head><body></body></html>"
    )
}

/// One legacy thread item carrying a top-level comment
pub fn thread(
    cid: &str,
    author: &str,
    text: &str,
    reply_count: u64,
    reply_token: Option<&str>,
) -> Value {
    let mut item = json!({
        "commentThreadRenderer": {
            "comment": {
                "commentRenderer": {
                    "commentId": cid,
                    "authorText": { "simpleText": author },
                    "contentText": { "runs": [ { "text": text } ] },
                    "voteCount": { "simpleText": "10" },
                    "replyCount": reply_count,
                    "publishedTimeText": { "runs": [ { "text": "1 day ago" } ] }
                }
            }
        }
    });

    if let Some(token) = reply_token {
        item["commentThreadRenderer"]["replies"] = json!({
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

    item
}

/// One bare reply renderer, as reply pages deliver them
pub fn reply(cid: &str, author: &str, text: &str) -> Value {
    json!({
        "commentRenderer": {
            "commentId": cid,
            "authorText": { "simpleText": author },
            "contentText": { "runs": [ { "text": text } ] },
            "voteCount": { "simpleText": "2" },
            "publishedTimeText": { "runs": [ { "text": "1 hour ago" } ] }
        }
    })
}

/// Wrap items in a reload-command response, optionally issuing a next token
pub fn page(mut items: Vec<Value>, next_token: Option<&str>) -> Value {
    if let Some(token) = next_token {
        items.push(json!({
            "continuationItemRenderer": {
                "continuationEndpoint": {
                    "continuationCommand": { "token": token }
                }
            }
        }));
    }

    json!({
        "onResponseReceivedEndpoints": [
            { "reloadContinuationItemsCommand": { "continuationItems": items } }
        ]
    })
}

/// A page of n generated top-level comments with a given cid prefix
pub fn page_of(prefix: &str, n: usize, next_token: Option<&str>) -> Value {
    let items = (0..n)
        .map(|i| thread(&format!("{prefix}-{i}"), "user", "text", 0, None))
        .collect();
    page(items, next_token)
}
