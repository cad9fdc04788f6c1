//! Retry with exponential backoff for engine requests.

use std::future::Future;
use std::time::Duration;

use elastices_repository::{ConnectionConfig, SearchError};
use tracing::{debug, info, warn};

/// How transient failures of a single request are retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
    /// Timeout applied to each attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ConnectionConfig::default())
    }
}

impl RetryPolicy {
    /// Build a policy from a connection config.
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_retry_delay_ms),
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
            timeout: config.timeout,
        }
    }

    /// A policy that tries once.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            timeout,
        }
    }
}

/// The last error of a request that did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure {
    /// Number of attempts made, including the first.
    pub attempts: u32,
    /// The error from the final attempt.
    pub error: SearchError,
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// retry limit is reached.
///
/// Each attempt is bounded by `policy.timeout`; an attempt that runs over
/// counts as a retryable timeout. The delay doubles after every failed
/// attempt, capped at `policy.max_delay`.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SearchError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::timeout(format!(
                "{} exceeded {}ms",
                operation,
                policy.timeout.as_millis()
            ))),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = %operation, attempt = attempt, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if !error.is_retryable() {
                    debug!(operation = %operation, error = %error, "Non-retryable error encountered");
                    return Err(RetryFailure {
                        attempts: attempt,
                        error,
                    });
                }

                // Don't wait after the last attempt
                if attempt > policy.max_retries {
                    return Err(RetryFailure {
                        attempts: attempt,
                        error,
                    });
                }

                warn!(
                    operation = %operation,
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Request failed, retrying"
                );

                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, policy.max_delay);
            }
        }
    }
}
