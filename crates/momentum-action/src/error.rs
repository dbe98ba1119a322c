//! Error types for the action planner.

use momentum_core::error::MomentumError;
use momentum_guard::GuardError;
use uuid::Uuid;

use crate::types::{ActionKind, ActionStatus};

/// Errors from planner and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Action not found: {0}")]
    NotFound(Uuid),
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(ActionStatus, ActionStatus),
    #[error("Action is not ready: {0}")]
    NotReady(Uuid),
    #[error("no executor registered for kind '{0}'")]
    NoExecutor(ActionKind),
    #[error("Kind '{kind}' is already handled by executor '{existing}'")]
    ExecutorConflict {
        kind: ActionKind,
        existing: &'static str,
    },
    #[error("Storage error: {0}")]
    Storage(#[from] MomentumError),
}

/// Errors from running a single action.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error("Execution failed: {0}")]
    Failed(String),
}
