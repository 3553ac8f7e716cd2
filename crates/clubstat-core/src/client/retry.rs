//! Retry with exponential backoff
//!
//! The caller decides what is retryable; the policy only decides how many
//! times and how long to wait. Sleeps happen strictly between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff after the zero-based `attempt` failed: `initial · multiplier^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(self.multiplier.saturating_pow(attempt))
    }

    /// Sleeps a fully failing run goes through
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay_for(attempt))
            .collect()
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. `op` receives the zero-based attempt number.
pub async fn with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < attempts && is_retryable(&e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {}ms",
                    attempt + 1,
                    attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
        assert!(RetryPolicy::none().schedule().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_on_unavailable() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), UpstreamError> = with_retry(
            &RetryPolicy::default(),
            UpstreamError::is_retryable,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(UpstreamError::from_status(503, "busy")) }
            },
        )
        .await;

        assert!(matches!(result, Err(UpstreamError::Unavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_on_rejected() {
        let calls = AtomicU32::new(0);

        let result: Result<(), UpstreamError> = with_retry(
            &RetryPolicy::default(),
            UpstreamError::is_retryable,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(UpstreamError::from_status(400, "bad")) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let result: Result<u32, UpstreamError> = with_retry(
            &RetryPolicy::default(),
            UpstreamError::is_retryable,
            |attempt| async move {
                if attempt == 0 {
                    Err(UpstreamError::from_status(503, ""))
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(result, Ok(1));
    }
}
