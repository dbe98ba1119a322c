//! Protective call layer for outbound work.
//!
//! Every call passes a circuit check, rate-limit admission, a concurrency
//! slot and a timed attempt loop with backoff, in that order.

pub mod circuit_breaker;
pub mod error;
pub mod executor;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState};
pub use error::GuardError;
pub use executor::{CallOptions, GuardStats, ProtectedExecutor};
pub use rate_limiter::SlidingWindowLimiter;
pub use retry::RetryPolicy;
