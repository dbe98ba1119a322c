//! Bounded retry with linear backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::error::GuardError;

/// How many times to try a call and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never less than 1.
    pub max_attempts: u32,
    /// Attempt `n` is followed by a wait of `n * base_delay`.
    pub base_delay: Duration,
    /// Upper bound of uniform random jitter added to each wait.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let linear = self.base_delay.saturating_mul(attempt);
        if self.jitter.is_zero() {
            return linear;
        }
        let extra = rand::rng().random_range(0..=self.jitter.as_millis() as u64);
        linear.saturating_add(Duration::from_millis(extra))
    }

    /// Run `call` until it succeeds or the attempt budget is spent.
    ///
    /// Each attempt is bounded by `timeout`. The error of the final attempt is
    /// returned, tagged with the number of attempts made.
    pub async fn run<F, Fut, T, E>(&self, timeout: Duration, mut call: F) -> Result<T, GuardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match tokio::time::timeout(timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => GuardError::Downstream {
                    attempts: attempt,
                    message: e.to_string(),
                },
                Err(_) => GuardError::Timeout {
                    attempts: attempt,
                    timeout,
                },
            };

            if attempt >= max_attempts {
                return Err(failure);
            }

            let delay = self.delay_for(attempt);
            debug!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::new(4, Duration::from_millis(200));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(600));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy =
            RetryPolicy::new(3, Duration::from_millis(100)).with_jitter(Duration::from_millis(50));
        for _ in 0..100 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let started = Instant::now();

        let counter = Arc::clone(&calls);
        let result: Result<&str, GuardError> = policy
            .run(Duration::from_secs(5), move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("flaky")
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second.
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2, Duration::from_millis(10));

        let counter = Arc::clone(&calls);
        let result: Result<(), GuardError> = policy
            .run(Duration::from_secs(1), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure #{}", n + 1)) }
            })
            .await;

        assert_eq!(
            result.unwrap_err(),
            GuardError::Downstream {
                attempts: 2,
                message: "failure #2".to_string()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried_then_reported() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let result: Result<(), GuardError> = policy
            .run(Duration::from_millis(100), || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<(), String>(())
            })
            .await;

        assert_eq!(
            result.unwrap_err(),
            GuardError::Timeout {
                attempts: 2,
                timeout: Duration::from_millis(100)
            }
        );
    }
}
