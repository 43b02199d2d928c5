//! Unified error handling for the ytcomb crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, plus the three-way
//! failure classification the retry layer branches on.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{FetchError, ParseError, SinkError};

/// Classification of a failed network operation
///
/// Drives the retry layer: `Permanent` failures are video-level terminal and
/// never retried; `Blocked` and `Transient` share the same retry budget and
/// differ only in how they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Terminal for this video: 404, disabled/private/unavailable content
    Permanent,
    /// Upstream refused the request: 403/429, captcha, bot detection
    Blocked,
    /// Everything retryable, and the default for unrecognized failures
    Transient,
}

impl ErrorCategory {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Blocked => "blocked",
            Self::Transient => "transient",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for the ytcomb crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse-specific errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
