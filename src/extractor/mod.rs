//! Comment extraction pipeline
//!
//! This module implements the core extraction flow: URL normalization,
//! landing-page bootstrap, and the paginated fetch loop, with retry
//! classification around every network call.
//!
//! [`Extractor`] is the configured entry point; one call to
//! [`Extractor::extract`] runs one video to a terminal result. Batches of
//! videos are processed strictly one at a time, in input order; each next
//! continuation token is only obtainable from the immediately preceding
//! response, and concurrent calls sharing one egress identity raise block
//! risk.

pub mod bootstrap;
pub mod egress;
pub mod engine;
pub mod fetcher;
pub mod parser;
pub mod url;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::error::ErrorCategory;
use crate::extractor::egress::EgressPool;
use crate::extractor::engine::PaginationEngine;
use crate::extractor::fetcher::PageFetcher;
use crate::models::{ExtractionResult, VideoMetadata};
use crate::storage::CommentSink;

/// Configured comment extractor
pub struct Extractor {
    config: Config,

    /// Egress rotation pool; each video gets the next handle
    egress_pool: EgressPool,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,
}

impl Extractor {
    /// Create a new extractor instance
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let egress_pool = EgressPool::from_proxies(&config.egress_proxies);

        Ok(Self {
            config,
            egress_pool,
            base_url: None,
        })
    }

    /// Route all requests to a mock server instead of the real platform
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    /// Extract comments for one video reference
    ///
    /// Never returns an error: malformed input and upstream failures all
    /// land in the terminal [`ExtractionResult`].
    pub async fn extract(
        &self,
        video_url: &str,
        sink: Option<&dyn CommentSink>,
    ) -> ExtractionResult {
        let normalized = url::normalize(video_url);

        let Some(video_id) = normalized.video_id else {
            let metadata = VideoMetadata {
                original_url: video_url.to_string(),
                ..Default::default()
            };
            return ExtractionResult::failed(
                metadata,
                normalized
                    .error
                    .unwrap_or_else(|| "invalid video URL".to_string()),
                ErrorCategory::Permanent,
            );
        };

        let egress = self.egress_pool.next_egress();
        info!(video_id = %video_id, egress = %egress.label, "Starting extraction");

        let fetcher = match PageFetcher::with_egress(self.config.extractor.clone(), &egress) {
            Ok(f) => match &self.base_url {
                Some(base) => f.with_base_url(base),
                None => f,
            },
            Err(e) => {
                let metadata = VideoMetadata {
                    video_id: video_id.clone(),
                    original_url: video_url.to_string(),
                    canonical_url: url::canonical_watch_url(&video_id),
                    ..Default::default()
                };
                return ExtractionResult::failed(
                    metadata,
                    e.to_string(),
                    ErrorCategory::Transient,
                );
            }
        };

        let engine = PaginationEngine::new(
            fetcher,
            self.config.retry_policy(),
            self.config.limits.clone(),
        );

        engine.extract(&video_id, video_url, sink).await
    }

    /// Extract a batch of videos sequentially, in input order
    ///
    /// Invalid references produce failed results in place; one video's
    /// failure never stops the rest of the batch.
    pub async fn extract_batch(
        &self,
        video_urls: &[String],
        sink: Option<&dyn CommentSink>,
    ) -> Vec<ExtractionResult> {
        let mut results = Vec::with_capacity(video_urls.len());

        for video_url in video_urls {
            results.push(self.extract(video_url, sink).await);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_fails_without_network() {
        let extractor = Extractor::new(Config::default()).unwrap();
        let result = extractor.extract("https://vimeo.com/123", None).await;

        assert!(!result.completed);
        assert_eq!(result.error_category, Some(ErrorCategory::Permanent));
        assert!(result.comments.is_empty());
        assert_eq!(result.metadata.original_url, "https://vimeo.com/123");
    }
}
