//! Bounded retry with exponential backoff for provider calls.
//!
//! Every attempt is individually bounded by a timeout. A timed-out attempt
//! counts as a failed attempt and is retried like any other error.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::utils::toml_config::RetryConfig;

/// Retry schedule for one kind of provider call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn none(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            timeout,
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            timeout: config.timeout(),
        }
    }
}

/// Why the final attempt of a retried call failed
#[derive(Debug)]
pub enum RetryError<E> {
    TimedOut(Duration),
    Failed(E),
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `operation` only labels log lines.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => RetryError::Failed(e),
            Err(_) => RetryError::TimedOut(policy.timeout),
        };

        if attempt >= policy.max_attempts {
            return Err(outcome);
        }

        let delay = policy.backoff_for(attempt);
        match &outcome {
            RetryError::Failed(e) => warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %e,
                "Provider call failed, retrying"
            ),
            RetryError::TimedOut(t) => warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                timeout_secs = t.as_secs(),
                "Provider call timed out, retrying"
            ),
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
