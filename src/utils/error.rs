//! Error types for the ytcomb extractor
//!
//! This module defines custom error types used throughout the application.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code from upstream
    #[error("Server returned status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be read or decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid egress proxy specification
    #[error("Invalid egress proxy: {0}")]
    InvalidEgress(String),
}

impl FetchError {
    /// HTTP status code carried by this error, when there is one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors that can occur while parsing landing pages and API responses
#[derive(Error, Debug)]
pub enum ParseError {
    /// No embedded initial-state document matched any known pattern
    #[error("Initial data not found in landing page")]
    InitialDataNotFound,

    /// Video id could not be extracted from the URL
    #[error("Failed to extract video id from URL")]
    IdExtractionFailed,

    /// JSON deserialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the output sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
