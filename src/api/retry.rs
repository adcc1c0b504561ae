//! Retry logic with exponential backoff for transient fetch failures.
//!
//! A failed fetch is classified into a [`FailureKind`]:
//! - [`FailureKind::Transient`] - timeouts, connection errors, 5xx responses
//! - [`FailureKind::Definitive`] - failures no retry will fix
//!
//! The [`RetryPolicy`] then decides whether to retry based on the kind and the
//! attempt count, doubling the delay each attempt. The loop is bounded only by
//! the attempt budget; there is no wall-clock cap.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::FetchError;

/// Base delay for the first retry (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Backoff multiplier (doubles each attempt).
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Maximum jitter added to each delay (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of a fetch failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, connection reset, 5xx server errors.
    Transient,

    /// Failure that will not succeed regardless of retries.
    ///
    /// Examples: invalid URL, TLS verification failure, local IO error,
    /// cancellation. 4xx statuses never reach this path: the client returns
    /// them as responses because they are classification signals.
    Definitive,
}

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed).
        attempt: u32,
    },

    /// Give up.
    GiveUp {
        /// Human-readable reason why no retry is attempted.
        reason: String,
    },
}

/// Bounded exponential-backoff retry policy.
///
/// Delay formula: `base_delay * 2^(attempt-1) + jitter`, where `attempt` is the
/// attempt that just failed. With the default 1s base, delays run 1s, 2s, 4s, 8s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
    /// Base delay for the first retry.
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_RETRY_COUNT,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with an explicit attempt budget and base delay.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Creates a policy with a custom attempt budget and the default base delay.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the configured attempt budget.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether to retry after a failed attempt.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> RetryDecision {
        if kind == FailureKind::Definitive {
            return RetryDecision::GiveUp {
                reason: "definitive failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "attempt budget exhausted");
            return RetryDecision::GiveUp {
                reason: format!("attempt budget ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the backoff delay for a retry, with jitter.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * BACKOFF_MULTIPLIER.powf(exponent);
        Duration::from_millis(delay_ms as u64) + calculate_jitter()
    }
}

/// Random jitter between 0 and [`MAX_JITTER`].
///
/// Prevents download workers that failed together from retrying in lockstep.
fn calculate_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(0..=MAX_JITTER.as_millis() as u64))
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Kind | Rationale |
/// |-------|------|-----------|
/// | Timeout | Transient | network may recover |
/// | Network | Transient | server may come back |
/// | Status (5xx) | Transient | server error is often temporary |
/// | SslVerification | Definitive | certificate will not change mid-run |
/// | InvalidUrl | Definitive | will never parse |
/// | Io | Definitive | local file system issue |
/// | Cancelled | Definitive | user asked to stop |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureKind {
    match error {
        FetchError::Timeout { .. } | FetchError::Network { .. } => FailureKind::Transient,
        FetchError::Status { status, .. } => classify_status(*status),
        FetchError::SslVerification { .. }
        | FetchError::InvalidUrl { .. }
        | FetchError::Io { .. }
        | FetchError::Cancelled => FailureKind::Definitive,
    }
}

/// Classifies an HTTP status code.
///
/// Only 5xx statuses count as transient; everything else that surfaces as an
/// error is definitive. 401/403/404 and other 4xx never become errors in the
/// first place - the client returns those responses to the caller.
#[must_use]
pub fn classify_status(status: u16) -> FailureKind {
    if (500..600).contains(&status) {
        FailureKind::Transient
    } else {
        FailureKind::Definitive
    }
}
