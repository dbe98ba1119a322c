//! Protected call executor.
//!
//! Composes the four protections around an arbitrary async call:
//! circuit check → rate-limit admission → concurrency slot → timed attempts
//! with backoff. One instance guards one downstream dependency and is shared
//! by `Arc` from the composition root.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use momentum_core::config::GuardConfig;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::error::GuardError;
use crate::rate_limiter::SlidingWindowLimiter;
use crate::retry::RetryPolicy;

/// Per-call deadline and attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    pub timeout: Duration,
    pub max_attempts: u32,
}

/// Running totals, read-only.
///
/// `total_calls` includes calls rejected by the breaker; `failures` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuardStats {
    pub total_calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub circuit_trips: u64,
    pub circuit_rejections: u64,
    pub rate_limit_delays: u64,
    pub window_occupancy: usize,
    pub circuit_state: CircuitState,
}

#[derive(Debug, Default)]
struct Counters {
    total_calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    circuit_rejections: AtomicU64,
    rate_limit_delays: AtomicU64,
}

/// Shields calls to one unreliable dependency.
#[derive(Debug)]
pub struct ProtectedExecutor {
    breaker: CircuitBreaker,
    limiter: SlidingWindowLimiter,
    slots: Semaphore,
    policy: RetryPolicy,
    defaults: CallOptions,
    counters: Counters,
}

impl ProtectedExecutor {
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(config.failure_threshold, config.cooldown()),
            limiter: SlidingWindowLimiter::new(
                config.rate_limit_capacity,
                config.rate_limit_window(),
            ),
            slots: Semaphore::new(config.max_concurrent_calls.max(1)),
            policy: RetryPolicy::new(config.max_attempts, config.base_delay())
                .with_jitter(config.jitter()),
            defaults: CallOptions {
                timeout: config.call_timeout(),
                max_attempts: config.max_attempts.max(1),
            },
            counters: Counters::default(),
        }
    }

    pub fn default_options(&self) -> CallOptions {
        self.defaults
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run one call with the configured timeout and attempt budget.
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<T, GuardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute_one(call, self.defaults).await
    }

    /// Run one call under all protections.
    ///
    /// A rejection by the breaker returns [`GuardError::CircuitOpen`] without
    /// invoking `call`. Only a failure that survives the whole attempt budget
    /// is reported to the breaker.
    pub async fn execute_one<F, Fut, T, E>(
        &self,
        call: F,
        options: CallOptions,
    ) -> Result<T, GuardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);

        let admission = match self.breaker.try_acquire() {
            Ok(admission) => admission,
            Err(e) => {
                self.counters
                    .circuit_rejections
                    .fetch_add(1, Ordering::Relaxed);
                debug!("Call rejected, circuit open");
                return Err(e);
            }
        };

        let delayed = self.limiter.acquire().await;
        if !delayed.is_zero() {
            self.counters
                .rate_limit_delays
                .fetch_add(1, Ordering::Relaxed);
        }

        // The semaphore is private and never closed.
        let _slot = self.slots.acquire().await.ok();

        let policy = RetryPolicy {
            max_attempts: options.max_attempts.max(1),
            ..self.policy
        };

        match policy.run(options.timeout, call).await {
            Ok(value) => {
                admission.success();
                self.counters.successes.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(e) => {
                admission.failure();
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Protected call failed");
                Err(e)
            }
        }
    }

    /// Run several calls concurrently with the default options.
    pub async fn execute_many<F, Fut, T, E>(&self, calls: Vec<F>) -> Vec<Result<T, GuardError>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute_many_with(calls, self.defaults).await
    }

    /// Run several calls concurrently under the same protections.
    ///
    /// Output position `i` holds the outcome of input `i`; errors are returned
    /// in place, never raised.
    pub async fn execute_many_with<F, Fut, T, E>(
        &self,
        calls: Vec<F>,
        options: CallOptions,
    ) -> Vec<Result<T, GuardError>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        join_all(
            calls
                .into_iter()
                .map(|call| self.execute_one(call, options)),
        )
        .await
    }

    pub fn stats(&self) -> GuardStats {
        let circuit = self.breaker.snapshot();
        GuardStats {
            total_calls: self.counters.total_calls.load(Ordering::Relaxed),
            successes: self.counters.successes.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            circuit_trips: circuit.trips,
            circuit_rejections: self.counters.circuit_rejections.load(Ordering::Relaxed),
            rate_limit_delays: self.counters.rate_limit_delays.load(Ordering::Relaxed),
            window_occupancy: self.limiter.occupancy(),
            circuit_state: circuit.state,
        }
    }
}
