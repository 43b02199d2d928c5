//! ytcomb - YouTube comment thread extractor
//!
//! Extracts comment threads from the platform's undocumented internal
//! paginated API, normalizing its two wire formats into one canonical
//! record stream while bounding total cost and tolerating partial failure.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`extractor`] - The extraction pipeline: URL normalization, landing
//!   page bootstrap, dual-format response parsing, retry classification,
//!   and the pagination engine
//! - [`models`] - Core data structures and types
//! - [`storage`] - Append-only output sinks
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use ytcomb::config::Config;
//! use ytcomb::extractor::Extractor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let extractor = Extractor::new(config)?;
//!     let result = extractor
//!         .extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ", None)
//!         .await;
//!     println!("collected {} comments", result.comment_count());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::extractor::Extractor;
    pub use crate::models::{Comment, CommentKind, ExtractionResult, VideoMetadata};
    pub use crate::storage::{CommentSink, JsonLinesSink};
}

// Direct re-exports for convenience
pub use models::{Comment, CommentKind, ExtractionResult, VideoMetadata};
