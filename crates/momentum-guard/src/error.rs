//! Error types for protected calls.

use std::time::Duration;

/// Why a protected call did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// The breaker is open; the wrapped call was never invoked.
    #[error("Circuit open: downstream calls are suspended")]
    CircuitOpen,
    /// Every attempt exceeded the per-call deadline.
    #[error("Call timed out after {attempts} attempt(s) ({timeout:?} each)")]
    Timeout { attempts: u32, timeout: Duration },
    /// The last attempt failed with an error from the wrapped call.
    #[error("Downstream call failed after {attempts} attempt(s): {message}")]
    Downstream { attempts: u32, message: String },
}

impl GuardError {
    /// True when the call was rejected by the breaker rather than failing downstream.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GuardError::CircuitOpen)
    }

    /// Attempts consumed before the error surfaced; zero when the call never ran.
    pub fn attempts(&self) -> u32 {
        match self {
            GuardError::CircuitOpen => 0,
            GuardError::Timeout { attempts, .. } | GuardError::Downstream { attempts, .. } => {
                *attempts
            }
        }
    }
}
