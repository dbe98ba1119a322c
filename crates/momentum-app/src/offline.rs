//! Offline stand-ins for the planner's external collaborators.
//!
//! They let the daemon run end to end without network access: the model and
//! tool backend echo their input, and reminders go to the log.

use async_trait::async_trait;
use serde_json::json;

use momentum_action::executor::{LanguageModel, Notifier, ToolBackend};
use momentum_action::ExecutorError;

pub struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(&self, prompt: &str) -> Result<String, ExecutorError> {
        tracing::debug!(chars = prompt.len(), "Offline model prompt");
        Ok(format!("[offline] {}", prompt))
    }
}

pub struct EchoTools;

#[async_trait]
impl ToolBackend for EchoTools {
    async fn invoke(
        &self,
        tool: &str,
        owner: &str,
        parameters: &serde_json::Value,
    ) -> Result<serde_json::Value, ExecutorError> {
        tracing::debug!(tool, owner, "Offline tool call");
        Ok(json!({
            "tool": tool,
            "owner": owner,
            "parameters": parameters,
            "accepted": true,
        }))
    }
}

pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, owner: &str, message: &str) -> Result<(), ExecutorError> {
        tracing::info!(owner = %owner, message = %message, "Reminder delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_model() {
        let text = EchoModel.complete("plan the week").await.unwrap();
        assert_eq!(text, "[offline] plan the week");
    }

    #[tokio::test]
    async fn test_echo_tools() {
        let params = json!({"minutes": 25});
        let out = EchoTools
            .invoke("start_session", "alice", &params)
            .await
            .unwrap();
        assert_eq!(out["tool"], "start_session");
        assert_eq!(out["parameters"], params);
        assert_eq!(out["accepted"], true);
    }

    #[tokio::test]
    async fn test_tracing_notifier() {
        assert!(TracingNotifier.notify("alice", "stretch").await.is_ok());
    }
}
