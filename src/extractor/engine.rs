//! Pagination engine
//!
//! Drives one video extraction through its phases: bootstrap the landing
//! page, page through top-level comments, then page through replies, ending
//! in a terminal [`ExtractionResult`]. The engine owns the only mutable
//! state of an extraction ([`PaginationState`]) and enforces every cost
//! bound: the per-request transport timeout (via the fetcher), a total
//! wall-clock budget, a first-batch deadline, the comment cap, and an
//! empty-page abort heuristic.
//!
//! Failure handling is phase-scoped: a failed fetch stops the current phase
//! but never discards what was already accumulated.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::LimitsConfig;
use crate::error::ErrorCategory;
use crate::extractor::bootstrap::{self, BootstrapData};
use crate::extractor::fetcher::{PageFetcher, PageRequest};
use crate::extractor::parser::parse_comment_page;
use crate::extractor::url::canonical_watch_url;
use crate::models::{Comment, ExtractionResult, VideoMetadata};
use crate::storage::CommentSink;
use crate::utils::retry::{run_with_retry, RetryOutcome, RetryPolicy};

/// Which deadline fired first
///
/// Both stop the extraction the same way; they are tracked separately
/// because a slow first response and a slow later page are different
/// upstream failure modes worth reporting apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeoutKind {
    FirstBatch,
    Total,
}

/// Per-video mutable extraction state
///
/// Created at extraction start, owned exclusively by the engine, discarded
/// at the end. Never persisted or shared across videos.
struct PaginationState {
    continuation_token: Option<String>,
    /// Reply continuations in discovery order: (parent cid, token)
    reply_queue: VecDeque<(String, String)>,
    consecutive_empty_pages: u32,
    started_at: Instant,
    first_batch_received: bool,
    comments: Vec<Comment>,
    seen_cids: HashSet<String>,
    timed_out: Option<TimeoutKind>,
    /// First fetch failure encountered, if any
    failure: Option<(String, ErrorCategory)>,
    aborted_on_empty: bool,
}

impl PaginationState {
    fn new(token: Option<String>, started_at: Instant) -> Self {
        Self {
            continuation_token: token,
            reply_queue: VecDeque::new(),
            consecutive_empty_pages: 0,
            started_at,
            first_batch_received: false,
            comments: Vec::new(),
            seen_cids: HashSet::new(),
            timed_out: None,
            failure: None,
            aborted_on_empty: false,
        }
    }

    fn cap_reached(&self, cap: Option<usize>) -> bool {
        cap.is_some_and(|c| self.comments.len() >= c)
    }

    /// Accept a page of parsed comments: session-wide cid dedup, cap
    /// enforcement. Returns the batch actually appended.
    fn accept(&mut self, incoming: Vec<Comment>, cap: Option<usize>) -> Vec<Comment> {
        let mut accepted = Vec::new();
        for comment in incoming {
            if self.cap_reached(cap) {
                break;
            }
            if self.seen_cids.insert(comment.cid.clone()) {
                self.comments.push(comment.clone());
                accepted.push(comment);
            }
        }
        accepted
    }
}

/// The pagination engine for one video
pub struct PaginationEngine {
    fetcher: PageFetcher,
    policy: RetryPolicy,
    limits: LimitsConfig,
}

impl PaginationEngine {
    pub fn new(fetcher: PageFetcher, policy: RetryPolicy, limits: LimitsConfig) -> Self {
        Self {
            fetcher,
            policy,
            limits,
        }
    }

    /// Run one extraction to its terminal result
    ///
    /// Accepted comment batches are pushed to `sink` as they arrive; the
    /// full accumulation is also returned in the result. This method never
    /// fails without returning whatever was collected first.
    pub async fn extract(
        &self,
        video_id: &str,
        original_url: &str,
        sink: Option<&dyn CommentSink>,
    ) -> ExtractionResult {
        // The clock starts before the bootstrap fetch: both deadlines are
        // measured from extraction start
        let started_at = Instant::now();

        let mut metadata = VideoMetadata {
            video_id: video_id.to_string(),
            original_url: original_url.to_string(),
            canonical_url: canonical_watch_url(video_id),
            title: String::new(),
            total_comments_count: None,
        };

        // Phase 1: bootstrap. The only phase whose failure ends the video
        // with zero output.
        let bootstrap_data = match self.bootstrap(video_id).await {
            Ok(data) => data,
            Err((error, category)) => {
                warn!(video_id, error = %error, category = %category, "Bootstrap failed");
                return ExtractionResult::failed(metadata, error, category);
            }
        };

        metadata.title = bootstrap_data.title.clone();
        metadata.total_comments_count = bootstrap_data.total_comments_count;

        if bootstrap_data.comments_disabled {
            info!(video_id, "Comments are disabled; zero-comment result");
            return ExtractionResult::completed(Vec::new(), metadata);
        }
        if bootstrap_data.continuation_token.is_none() {
            info!(video_id, "No comment continuation on landing page; nothing to fetch");
            return ExtractionResult::completed(Vec::new(), metadata);
        }

        let mut state = PaginationState::new(bootstrap_data.continuation_token, started_at);
        let cap = self.limits.max_comments;

        // Phase 2: top-level pages
        self.page_top_level(&mut state, &metadata, sink).await;

        // Phase 3: replies, only if the budget allows
        if state.timed_out.is_none() && !state.cap_reached(cap) {
            self.page_replies(&mut state, &metadata, sink).await;
        }

        self.finish(state, metadata)
    }

    async fn bootstrap(&self, video_id: &str) -> Result<BootstrapData, (String, ErrorCategory)> {
        let outcome = run_with_retry(&self.policy, || async move {
            self.fetcher.fetch_watch_page(video_id).await
        })
        .await;

        let html = match outcome {
            RetryOutcome::Success(html) => html,
            RetryOutcome::Failure {
                error, category, ..
            } => return Err((error, category)),
        };

        bootstrap::parse_landing_page(&html)
            .map_err(|e| (e.to_string(), ErrorCategory::Transient))
    }

    async fn page_top_level(
        &self,
        state: &mut PaginationState,
        metadata: &VideoMetadata,
        sink: Option<&dyn CommentSink>,
    ) {
        let cap = self.limits.max_comments;

        while let Some(token) = state.continuation_token.clone() {
            if self.check_timeouts(state) || state.cap_reached(cap) {
                break;
            }

            let request = PageRequest::Continuation(token);
            let outcome = run_with_retry(&self.policy, || {
                let request = request.clone();
                async move { self.fetcher.fetch_comment_page(&request).await }
            })
            .await;

            let response = match outcome {
                RetryOutcome::Success(value) => value,
                RetryOutcome::Failure {
                    error,
                    category,
                    attempts,
                } => {
                    warn!(
                        error = %error,
                        category = %category,
                        attempts,
                        collected = state.comments.len(),
                        "Top-level fetch failed; keeping accumulated comments"
                    );
                    state.failure = Some((error, category));
                    break;
                }
            };

            let parsed = parse_comment_page(&response, metadata, None);
            state.continuation_token = parsed.next_token;
            state.reply_queue.extend(parsed.reply_tokens);

            let accepted = state.accept(parsed.comments, cap);
            if accepted.is_empty() {
                state.consecutive_empty_pages += 1;
                debug!(
                    streak = state.consecutive_empty_pages,
                    "Empty top-level page"
                );
                if state.consecutive_empty_pages >= self.limits.max_empty_pages {
                    warn!(
                        streak = state.consecutive_empty_pages,
                        "Aborting after consecutive empty pages"
                    );
                    state.aborted_on_empty = true;
                    break;
                }
            } else {
                state.consecutive_empty_pages = 0;
                state.first_batch_received = true;
                self.push_batch(sink, &accepted).await;
            }
        }
    }

    async fn page_replies(
        &self,
        state: &mut PaginationState,
        metadata: &VideoMetadata,
        sink: Option<&dyn CommentSink>,
    ) {
        let cap = self.limits.max_comments;

        // Only parents that declared replies are worth a request
        let declared: HashSet<String> = state
            .comments
            .iter()
            .filter(|c| c.reply_count > 0)
            .map(|c| c.cid.clone())
            .collect();

        while let Some((parent, token)) = state.reply_queue.pop_front() {
            if !declared.contains(&parent) {
                continue;
            }
            if self.check_timeouts(state) || state.cap_reached(cap) {
                break;
            }

            let request = PageRequest::Continuation(token);
            let outcome = run_with_retry(&self.policy, || {
                let request = request.clone();
                async move { self.fetcher.fetch_comment_page(&request).await }
            })
            .await;

            let response = match outcome {
                RetryOutcome::Success(value) => value,
                RetryOutcome::Failure {
                    error,
                    category,
                    attempts,
                } => {
                    warn!(
                        parent = %parent,
                        error = %error,
                        category = %category,
                        attempts,
                        "Reply fetch failed; stopping reply phase"
                    );
                    if state.failure.is_none() {
                        state.failure = Some((error, category));
                    }
                    break;
                }
            };

            let parsed = parse_comment_page(&response, metadata, Some(&parent));
            // The parent's chain continues ahead of other parents
            if let Some(next) = parsed.next_token {
                state.reply_queue.push_front((parent.clone(), next));
            }

            let accepted = state.accept(parsed.comments, cap);
            if accepted.is_empty() {
                state.consecutive_empty_pages += 1;
                if state.consecutive_empty_pages >= self.limits.max_empty_pages {
                    warn!("Aborting reply phase after consecutive empty pages");
                    state.aborted_on_empty = true;
                    break;
                }
            } else {
                state.consecutive_empty_pages = 0;
                state.first_batch_received = true;
                self.push_batch(sink, &accepted).await;
            }
        }
    }

    /// Evaluate both deadlines; returns true when extraction must stop
    fn check_timeouts(&self, state: &mut PaginationState) -> bool {
        if state.timed_out.is_some() {
            return true;
        }

        let elapsed = state.started_at.elapsed();

        if elapsed >= self.limits_total() {
            warn!(elapsed_secs = elapsed.as_secs(), "Total extraction timeout");
            state.timed_out = Some(TimeoutKind::Total);
            return true;
        }

        if !state.first_batch_received && elapsed >= self.limits_first_batch() {
            warn!(
                elapsed_secs = elapsed.as_secs(),
                "First-batch deadline passed before any comments arrived"
            );
            state.timed_out = Some(TimeoutKind::FirstBatch);
            return true;
        }

        false
    }

    fn limits_total(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.limits.total_timeout_secs)
    }

    fn limits_first_batch(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.limits.first_batch_timeout_secs)
    }

    async fn push_batch(&self, sink: Option<&dyn CommentSink>, batch: &[Comment]) {
        if let Some(sink) = sink {
            if let Err(e) = sink.append(batch).await {
                // Losing a sink write must not lose the extraction
                warn!(error = %e, "Sink append failed");
            }
        }
    }

    fn finish(&self, state: PaginationState, metadata: VideoMetadata) -> ExtractionResult {
        let cap = self.limits.max_comments;
        let cap_hit = state.cap_reached(cap);
        let tokens_remain = state.continuation_token.is_some() || !state.reply_queue.is_empty();

        let completed = state.timed_out.is_none()
            && state.failure.is_none()
            && !state.aborted_on_empty
            && !cap_hit
            && !tokens_remain;

        info!(
            video_id = %metadata.video_id,
            comments = state.comments.len(),
            completed,
            "Extraction finished"
        );

        if completed {
            return ExtractionResult::completed(state.comments, metadata);
        }

        let (error, category) = match (&state.timed_out, &state.failure) {
            (Some(TimeoutKind::FirstBatch), _) => {
                (Some("first-batch deadline exceeded".to_string()), None)
            }
            (Some(TimeoutKind::Total), _) => {
                (Some("total extraction timeout exceeded".to_string()), None)
            }
            (None, Some((error, category))) => (Some(error.clone()), Some(*category)),
            (None, None) if state.aborted_on_empty => (
                Some(format!(
                    "aborted after {} consecutive empty pages",
                    self.limits.max_empty_pages
                )),
                None,
            ),
            (None, None) => (None, None), // cap reached
        };

        ExtractionResult::partial(state.comments, metadata, error, category)
    }
}
