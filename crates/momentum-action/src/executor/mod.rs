//! Executor trait and kind-to-executor routing.
//!
//! Every [`ActionKind`] is served by at most one executor. The planner looks
//! the executor up at dispatch time, so kinds without one fail the action
//! instead of being skipped.

pub mod chain;
pub mod notification;
pub mod tool;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ExecutorError, PlannerError};
use crate::types::{Action, ActionKind};

pub use chain::{ChainExecutor, LanguageModel};
pub use notification::{NotificationExecutor, Notifier};
pub use tool::{ToolBackend, ToolExecutor};

/// Runs actions of one or more kinds.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Short name used in logs and conflict errors.
    fn name(&self) -> &'static str;

    /// Kinds this executor claims.
    fn kinds(&self) -> &[ActionKind];

    /// Run the action, returning its result payload.
    async fn execute(&self, action: &Action) -> Result<serde_json::Value, ExecutorError>;
}

/// Routing table from action kind to executor.
#[derive(Default)]
pub struct ExecutorTable {
    by_kind: HashMap<ActionKind, Arc<dyn ActionExecutor>>,
}

impl ExecutorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for every kind it claims.
    ///
    /// Registration is all-or-nothing: if any kind is taken, nothing is
    /// registered.
    pub fn register(&mut self, executor: Arc<dyn ActionExecutor>) -> Result<(), PlannerError> {
        for kind in executor.kinds() {
            if let Some(existing) = self.by_kind.get(kind) {
                return Err(PlannerError::ExecutorConflict {
                    kind: *kind,
                    existing: existing.name(),
                });
            }
        }

        for kind in executor.kinds() {
            self.by_kind.insert(*kind, Arc::clone(&executor));
        }
        tracing::debug!(
            executor = executor.name(),
            kinds = executor.kinds().len(),
            "Executor registered"
        );
        Ok(())
    }

    pub fn resolve(&self, kind: ActionKind) -> Option<Arc<dyn ActionExecutor>> {
        self.by_kind.get(&kind).cloned()
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|k| self.by_kind.contains_key(k))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

/// Read a required, non-empty string parameter.
pub(crate) fn required_str<'a>(
    parameters: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, ExecutorError> {
    match parameters.get(field).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ExecutorError::InvalidParameters(format!(
            "'{}' must be a non-empty string",
            field
        ))),
    }
}
