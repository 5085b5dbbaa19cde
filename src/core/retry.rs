//! Retry logic with exponential backoff.
//!
//! Used by the completion client to ride out transient provider failures
//! (network errors, rate limiting, 5xx responses). Which errors count as
//! transient is decided by the caller through a retry policy.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one (1 = no retries).
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 = double each time).
    pub backoff_multiplier: f64,

    /// Whether to add up to 25% jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Create a config with a single attempt (fail fast).
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }

    /// Create a config with near-zero delays, for tests and local stubs.
    pub fn quick(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            capped_delay * (1.0 + rand_jitter() * 0.25)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Pseudo-random jitter in 0.0..1.0 from the clock's sub-second nanos.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,

    /// Total time spent (including delays).
    pub total_time: Duration,

    /// Whether the operation was retried.
    pub was_retried: bool,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Return the error immediately.
    Stop,

    /// Retry after the configured backoff delay.
    Retry,

    /// Retry after at least this long (e.g. a server-provided `retry-after`).
    RetryAfter(Duration),
}

/// Retry an async operation, consulting `policy` after every failure.
///
/// A server hint from [`RetryDecision::RetryAfter`] lengthens the backoff
/// delay but never beyond `max_delay`.
pub async fn retry_async_with<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    policy: P,
) -> RetryResult<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> RetryDecision,
{
    let start = Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = operation().await;

        let decision = match &result {
            Ok(_) => RetryDecision::Stop,
            Err(_) if attempts >= max_attempts => RetryDecision::Stop,
            Err(e) => policy(e),
        };

        let delay = match decision {
            RetryDecision::Stop => {
                return RetryResult {
                    result,
                    attempts,
                    total_time: start.elapsed(),
                    was_retried: attempts > 1,
                };
            }
            RetryDecision::Retry => config.delay_after_attempt(attempts),
            RetryDecision::RetryAfter(hint) => {
                config.delay_after_attempt(attempts).max(hint).min(config.max_delay)
            }
        };

        if let Err(e) = &result {
            tracing::warn!(
                attempt = attempts,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %e,
                "Attempt failed, retrying"
            );
        }
        tokio::time::sleep(delay).await;
    }
}
