//! Language-model backed executor for reasoning kinds.

use std::sync::Arc;

use async_trait::async_trait;
use momentum_guard::ProtectedExecutor;
use serde_json::json;

use crate::error::ExecutorError;
use crate::executor::{required_str, ActionExecutor};
use crate::types::{Action, ActionKind};

/// Text completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ExecutorError>;
}

const KINDS: [ActionKind; 4] = [
    ActionKind::Breakdown,
    ActionKind::Analysis,
    ActionKind::Motivation,
    ActionKind::ProofValidation,
];

/// Renders a prompt per kind and runs it through the protected call layer.
pub struct ChainExecutor {
    model: Arc<dyn LanguageModel>,
    guard: Arc<ProtectedExecutor>,
}

impl ChainExecutor {
    pub fn new(model: Arc<dyn LanguageModel>, guard: Arc<ProtectedExecutor>) -> Self {
        Self { model, guard }
    }

    /// Build the prompt for `action`. Missing required parameters are
    /// rejected here so a bad request never reaches the model.
    pub fn render_prompt(action: &Action) -> Result<String, ExecutorError> {
        let params = &action.parameters;
        match action.kind {
            ActionKind::Breakdown => {
                let task = required_str(params, "task")?;
                Ok(format!(
                    "Break the task \"{}\" into small, concrete steps that can each be done in under 25 minutes.",
                    task
                ))
            }
            ActionKind::Analysis => {
                let subject = required_str(params, "subject")?;
                Ok(format!(
                    "Analyze the following and list the key blockers and next steps:\n{}",
                    subject
                ))
            }
            ActionKind::Motivation => {
                let goal = params
                    .get("goal")
                    .and_then(|v| v.as_str())
                    .filter(|g| !g.trim().is_empty())
                    .unwrap_or("getting started");
                Ok(format!(
                    "Write a short, encouraging message for {} about {}.",
                    action.owner, goal
                ))
            }
            ActionKind::ProofValidation => {
                let task = required_str(params, "task")?;
                let proof = required_str(params, "proof")?;
                Ok(format!(
                    "Does the following proof show that \"{}\" was completed? Answer yes or no, then explain.\nProof: {}",
                    task, proof
                ))
            }
            other => Err(ExecutorError::InvalidParameters(format!(
                "kind '{}' is not a chain kind",
                other
            ))),
        }
    }
}

#[async_trait]
impl ActionExecutor for ChainExecutor {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn kinds(&self) -> &[ActionKind] {
        &KINDS
    }

    async fn execute(&self, action: &Action) -> Result<serde_json::Value, ExecutorError> {
        let prompt = Self::render_prompt(action)?;
        let prompt = prompt.as_str();
        let model = &self.model;

        let text = self.guard.execute(|| model.complete(prompt)).await?;

        tracing::debug!(action_id = %action.id, kind = %action.kind, chars = text.len(), "Chain completed");
        Ok(json!({ "kind": action.kind, "text": text }))
    }
}
