// Core data structures for the ytcomb extractor

use serde::{Deserialize, Serialize};

use crate::error::ErrorCategory;

/// Immutable per-video metadata produced by the page bootstrapper
///
/// Created once per extraction and stamped onto every emitted [`Comment`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoMetadata {
    /// Opaque 11-character video id
    pub video_id: String,
    /// URL exactly as supplied by the caller
    pub original_url: String,
    /// Canonical watch-page URL
    pub canonical_url: String,
    pub title: String,
    /// Declared total comment count, when the landing page exposes one
    pub total_comments_count: Option<u64>,
}

/// Whether a record is a top-level comment or a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Comment,
    Reply,
}

impl Default for CommentKind {
    fn default() -> Self {
        Self::Comment
    }
}

/// One canonical comment record
///
/// Both upstream wire encodings normalize into this shape. Invariants held
/// by the pipeline: `cid` is unique within one extraction, `author` is never
/// empty, and a `Reply` always carries the `parent_cid` of a top-level
/// comment emitted earlier in the same extraction.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Comment {
    pub cid: String,
    pub text: String,
    pub author: String,
    pub video_id: String,
    pub page_url: String,
    pub title: String,
    pub total_comments_count: Option<u64>,
    pub vote_count: u64,
    pub reply_count: u64,
    pub is_author_owner: bool,
    pub has_creator_heart: bool,
    pub kind: CommentKind,
    pub parent_cid: Option<String>,
    /// Upstream's human-readable age string (e.g. "3 days ago"), kept verbatim
    pub relative_date: String,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.kind == CommentKind::Reply
    }

    /// Stamp video metadata onto this record
    pub fn with_metadata(mut self, meta: &VideoMetadata) -> Self {
        self.video_id = meta.video_id.clone();
        self.page_url = meta.canonical_url.clone();
        self.title = meta.title.clone();
        self.total_comments_count = meta.total_comments_count;
        self
    }
}

/// Terminal outcome of one video extraction
///
/// `completed` is true only when the comment stream was exhausted: no
/// continuation token left, no eligible replies left, and the requested cap
/// was not hit. Anything else (cap, timeout, mid-loop fetch failure) is a
/// partial result that still carries everything collected so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub comments: Vec<Comment>,
    pub metadata: VideoMetadata,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
}

impl ExtractionResult {
    /// Successful terminal result with the full comment stream consumed
    pub fn completed(comments: Vec<Comment>, metadata: VideoMetadata) -> Self {
        Self {
            comments,
            metadata,
            completed: true,
            error: None,
            error_category: None,
        }
    }

    /// Partial result: something was collected, extraction stopped early
    pub fn partial(
        comments: Vec<Comment>,
        metadata: VideoMetadata,
        error: Option<String>,
        category: Option<ErrorCategory>,
    ) -> Self {
        Self {
            comments,
            metadata,
            completed: false,
            error,
            error_category: category,
        }
    }

    /// Failure before any comment could be parsed
    pub fn failed(metadata: VideoMetadata, error: String, category: ErrorCategory) -> Self {
        Self {
            comments: Vec::new(),
            metadata,
            completed: false,
            error: Some(error),
            error_category: Some(category),
        }
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_metadata_stamps_all_fields() {
        let meta = VideoMetadata {
            video_id: "dQw4w9WgXcQ".to_string(),
            original_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            canonical_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            title: "Test Video".to_string(),
            total_comments_count: Some(1200),
        };

        let comment = Comment {
            cid: "abc".to_string(),
            author: "user".to_string(),
            ..Default::default()
        }
        .with_metadata(&meta);

        assert_eq!(comment.video_id, "dQw4w9WgXcQ");
        assert_eq!(comment.page_url, meta.canonical_url);
        assert_eq!(comment.title, "Test Video");
        assert_eq!(comment.total_comments_count, Some(1200));
    }

    #[test]
    fn test_comment_kind_serialization() {
        let json = serde_json::to_string(&CommentKind::Reply).unwrap();
        assert_eq!(json, r#""reply""#);
        let json = serde_json::to_string(&CommentKind::Comment).unwrap();
        assert_eq!(json, r#""comment""#);
    }

    #[test]
    fn test_extraction_result_constructors() {
        let meta = VideoMetadata::default();

        let done = ExtractionResult::completed(vec![], meta.clone());
        assert!(done.completed);
        assert!(done.error.is_none());

        let partial = ExtractionResult::partial(
            vec![Comment::default()],
            meta.clone(),
            Some("cap reached".to_string()),
            None,
        );
        assert!(!partial.completed);
        assert_eq!(partial.comment_count(), 1);

        let failed = ExtractionResult::failed(
            meta,
            "landing page unreachable".to_string(),
            ErrorCategory::Transient,
        );
        assert!(!failed.completed);
        assert_eq!(failed.comment_count(), 0);
        assert_eq!(failed.error_category, Some(ErrorCategory::Transient));
    }
}
