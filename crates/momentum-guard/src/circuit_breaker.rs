//! Failure-isolation state machine guarding one downstream dependency.
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └───▲────┘             └────┬─────┘
//!     │                        │  probe failure        │
//!     │                        └───────────────────────┤
//!     │  probe success                                 │
//!     └────────────────────────────────────────────────┘
//! ```
//!
//! Half-open admits exactly one probe; everyone else is rejected until the
//! probe settles.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::GuardError;

/// Breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub trips: u64,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    probe_in_flight: bool,
    trips: u64,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
                probe_in_flight: false,
                trips: 0,
            }),
        }
    }

    /// Ask to pass a call through.
    ///
    /// - Closed: admitted.
    /// - Open: rejected with [`GuardError::CircuitOpen`] until the cooldown since
    ///   the last failure elapses, then moves to half-open and admits a probe.
    /// - HalfOpen: admitted only if no probe is in flight.
    pub fn try_acquire(&self) -> Result<Admission<'_>, GuardError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission::new(self, false)),
            CircuitState::Open => {
                let cooled = inner
                    .last_failure_at
                    .is_none_or(|at| at.elapsed() >= self.cooldown);
                if cooled {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    info!("Circuit half-open, admitting probe call");
                    Ok(Admission::new(self, true))
                } else {
                    Err(GuardError::CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(GuardError::CircuitOpen)
                } else {
                    inner.probe_in_flight = true;
                    Ok(Admission::new(self, true))
                }
            }
        }
    }

    /// Settle a successful call.
    ///
    /// Only the half-open probe closes the circuit. A plain call that was
    /// admitted before a trip and succeeds afterwards leaves an open or
    /// half-open breaker untouched; while closed it clears the failure count.
    fn record_success(&self, probe: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen if probe => {
                info!("Circuit closed after successful probe");
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.probe_in_flight = false;
            }
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::Open | CircuitState::HalfOpen => {
                debug!(state = %inner.state, "Ignoring late success");
            }
        }
    }

    /// Settle a failed call. Returns `true` when this failure opened the circuit.
    fn record_failure(&self, probe: bool) -> bool {
        let mut inner = self.lock();
        // A late failure while half-open does not decide recovery; the probe does.
        if inner.state == CircuitState::HalfOpen && !probe {
            return false;
        }

        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());

        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.failure_threshold,
            // Late failure from a call admitted before the trip: the cooldown restarts.
            CircuitState::Open => false,
        };

        if probe {
            inner.probe_in_flight = false;
        }
        if trip {
            inner.state = CircuitState::Open;
            inner.trips += 1;
            warn!(
                consecutive_failures = inner.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Circuit opened"
            );
        }
        trip
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            trips: inner.trips,
        }
    }

    /// Force the breaker back to closed, e.g. after an operator fixed the dependency.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.last_failure_at = None;
        inner.probe_in_flight = false;
    }

    fn release_probe(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A call admitted by the breaker.
///
/// Settle it with [`Admission::success`] or [`Admission::failure`]. Dropping an
/// unsettled probe frees the half-open slot without counting an outcome.
#[must_use = "an admission must be settled with success() or failure()"]
pub struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> Admission<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    /// Whether this call is the half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success(self.probe);
    }

    /// Returns `true` when this failure opened the circuit.
    pub fn failure(mut self) -> bool {
        self.settled = true;
        self.breaker.record_failure(self.probe)
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe();
        }
    }
}
