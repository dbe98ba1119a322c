//! Sliding-window admission control.
//!
//! Keeps the instants of recently admitted calls. A caller arriving while the
//! window is full is suspended until the oldest entry ages out, then admitted.
//! Callers are never rejected.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Rolling-window rate limiter with backpressure.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    capacity: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Allow at most `capacity` admissions in any span of `window`.
    ///
    /// A capacity of zero is treated as one so callers cannot wait forever.
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1) as usize,
            window,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for a slot in the window and record the admission.
    ///
    /// Returns how long the caller was held back (zero when admitted at once).
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        loop {
            let wait = {
                let mut admitted = self.lock();
                let now = Instant::now();
                self.prune(&mut admitted, now);

                if admitted.len() < self.capacity {
                    admitted.push_back(now);
                    None
                } else {
                    // Full window implies a front entry.
                    admitted
                        .front()
                        .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                }
            };

            match wait {
                None => return started.elapsed(),
                Some(delay) => {
                    debug!(
                        delay_ms = delay.as_millis() as u64,
                        capacity = self.capacity,
                        "Rate limit reached, delaying call"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Number of admissions currently inside the window.
    pub fn occupancy(&self) -> usize {
        let mut admitted = self.lock();
        self.prune(&mut admitted, Instant::now());
        admitted.len()
    }

    fn prune(&self, admitted: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = admitted.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The queue holds plain instants; a panic mid-update cannot leave it inconsistent.
        self.admitted.lock().unwrap_or_else(|e| e.into_inner())
    }
}
