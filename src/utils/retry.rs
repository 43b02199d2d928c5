//! Retry utilities with failure classification
//!
//! Every outbound fetch goes through [`run_with_retry`], which classifies
//! each failure into one of three categories and applies jittered
//! exponential backoff for the retryable ones. A wrapped call never panics
//! or propagates an error past this boundary: the caller always receives a
//! [`RetryOutcome`] to branch on.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ErrorCategory;
use crate::utils::error::FetchError;

/// Configuration for retry behavior
///
/// All four numbers are injected; call sites never carry literals, so a
/// profile swap (e.g. `safe` to `fast`) touches configuration only.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Width of the multiplicative jitter band around the computed delay
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::safe()
    }
}

impl RetryPolicy {
    /// Conservative profile: patient backoff for long unattended runs
    pub fn safe() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter: 0.3,
        }
    }

    /// Aggressive profile: one quick retry, tight caps
    pub fn fast() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 250,
            max_delay_ms: 1000,
            jitter: 0.3,
        }
    }

    /// Look up a named profile
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "safe" => Some(Self::safe()),
            "fast" => Some(Self::fast()),
            _ => None,
        }
    }

    /// Backoff delay before retry number `retry` (0-based), jitter applied
    ///
    /// The deterministic part is `min(max_delay, base_delay * 2^retry)`;
    /// the result is then widened by a factor drawn uniformly from
    /// `[1 - jitter/2, 1 + jitter/2]`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponential = (self.base_delay_ms as f64) * 2f64.powi(retry as i32);
        let capped = exponential.min(self.max_delay_ms as f64);

        let factor = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(1.0 - self.jitter / 2.0..=1.0 + self.jitter / 2.0)
        } else {
            1.0
        };

        Duration::from_millis((capped * factor) as u64)
    }
}

/// Tri-state result of a classifier-wrapped operation
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// The operation eventually succeeded
    Success(T),
    /// All attempts failed (or the first failure was Permanent)
    Failure {
        error: String,
        category: ErrorCategory,
        attempts: u32,
    },
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Successful value, discarding failure details
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(v) => Some(v),
            Self::Failure { .. } => None,
        }
    }
}

/// Classify a failed operation from its status code and message
///
/// Precedence is top-down; the first matching row wins. Anything
/// unrecognized lands in `Transient` so unknown failures still get a retry.
pub fn classify(status: Option<u16>, message: &str) -> ErrorCategory {
    let msg = message.to_lowercase();

    if status == Some(404)
        || msg.contains("disabled")
        || msg.contains("private")
        || msg.contains("unavailable")
        || msg.contains("age-restricted")
    {
        return ErrorCategory::Permanent;
    }

    if matches!(status, Some(403) | Some(429))
        || msg.contains("captcha")
        || msg.contains("bot-detected")
    {
        return ErrorCategory::Blocked;
    }

    if status.is_some_and(|s| (500..600).contains(&s))
        || msg.contains("timeout")
        || msg.contains("connection-reset")
        || msg.contains("connection reset")
    {
        return ErrorCategory::Transient;
    }

    ErrorCategory::Transient
}

/// Execute a fetch operation with classification and backoff
///
/// Permanent failures return immediately; Blocked and Transient share the
/// policy's retry budget. Blocked is logged at warn with operator guidance
/// since it usually signals the egress identity is burned.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> RetryOutcome<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut last_error = None;
    let mut attempts = 0;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.backoff_delay(attempt - 1);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }

        attempts = attempt + 1;

        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return RetryOutcome::Success(value);
            }
            Err(e) => {
                let message = e.to_string();
                let category = classify(e.status_code(), &message);

                match category {
                    ErrorCategory::Permanent => {
                        debug!(error = %message, "Permanent failure, not retrying");
                        return RetryOutcome::Failure {
                            error: message,
                            category,
                            attempts,
                        };
                    }
                    ErrorCategory::Blocked => {
                        warn!(
                            attempt,
                            error = %message,
                            "Request blocked upstream; consider rotating egress"
                        );
                    }
                    ErrorCategory::Transient => {
                        warn!(attempt, error = %message, "Transient fetch failure");
                    }
                }

                last_error = Some((message, category));
            }
        }
    }

    let (error, category) = last_error
        .unwrap_or_else(|| ("operation failed with no error details".to_string(), ErrorCategory::Transient));

    RetryOutcome::Failure {
        error,
        category,
        attempts,
    }
}
