//! Executor for kinds backed by an external tool service.

use std::sync::Arc;

use async_trait::async_trait;
use momentum_guard::ProtectedExecutor;

use crate::error::ExecutorError;
use crate::executor::ActionExecutor;
use crate::types::{Action, ActionKind};

/// Named tool invocation, e.g. a calendar or points service.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn invoke(
        &self,
        tool: &str,
        owner: &str,
        parameters: &serde_json::Value,
    ) -> Result<serde_json::Value, ExecutorError>;
}

const KINDS: [ActionKind; 6] = [
    ActionKind::ScheduleTask,
    ActionKind::StartSession,
    ActionKind::UpdateMood,
    ActionKind::AwardPoints,
    ActionKind::PlayRitual,
    ActionKind::CalendarSync,
];

/// Forwards the action to the tool named after its kind.
pub struct ToolExecutor {
    backend: Arc<dyn ToolBackend>,
    guard: Arc<ProtectedExecutor>,
}

impl ToolExecutor {
    pub fn new(backend: Arc<dyn ToolBackend>, guard: Arc<ProtectedExecutor>) -> Self {
        Self { backend, guard }
    }
}

#[async_trait]
impl ActionExecutor for ToolExecutor {
    fn name(&self) -> &'static str {
        "tool"
    }

    fn kinds(&self) -> &[ActionKind] {
        &KINDS
    }

    async fn execute(&self, action: &Action) -> Result<serde_json::Value, ExecutorError> {
        let tool = action.kind.as_str();
        let owner = action.owner.as_str();
        let parameters = &action.parameters;
        let backend = &self.backend;

        let output = self
            .guard
            .execute(|| backend.invoke(tool, owner, parameters))
            .await?;

        tracing::debug!(action_id = %action.id, tool, "Tool invoked");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionStatus, Priority};
    use chrono::Utc;
    use momentum_core::config::GuardConfig;
    use momentum_guard::GuardError;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(String, String, serde_json::Value)>>,
    }

    #[async_trait]
    impl ToolBackend for RecordingBackend {
        async fn invoke(
            &self,
            tool: &str,
            owner: &str,
            parameters: &serde_json::Value,
        ) -> Result<serde_json::Value, ExecutorError> {
            self.calls
                .lock()
                .unwrap()
                .push((tool.to_string(), owner.to_string(), parameters.clone()));
            if tool == "calendar_sync" {
                return Err(ExecutorError::Failed("calendar unreachable".to_string()));
            }
            Ok(json!({"ok": true, "tool": tool}))
        }
    }

    fn action(kind: ActionKind) -> Action {
        let now = Utc::now();
        Action {
            id: Uuid::new_v4(),
            kind,
            priority: Priority::Low,
            owner: "bob".to_string(),
            parameters: json!({"points": 10}),
            dependencies: vec![],
            not_before: None,
            status: ActionStatus::InProgress,
            attempts: 1,
            max_attempts: 3,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            execution_duration: None,
            sequence: 0,
        }
    }

    fn executor(backend: Arc<RecordingBackend>) -> ToolExecutor {
        let guard = ProtectedExecutor::new(&GuardConfig {
            max_attempts: 1,
            ..GuardConfig::default()
        });
        ToolExecutor::new(backend, Arc::new(guard))
    }

    #[tokio::test]
    async fn test_forwards_tool_owner_and_parameters() {
        let backend = Arc::new(RecordingBackend::default());
        let output = executor(backend.clone())
            .execute(&action(ActionKind::AwardPoints))
            .await
            .unwrap();

        assert_eq!(output, json!({"ok": true, "tool": "award_points"}));
        let calls = backend.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            ("award_points".to_string(), "bob".to_string(), json!({"points": 10}))
        );
    }

    #[tokio::test]
    async fn test_backend_error_surfaces_as_guard_error() {
        let backend = Arc::new(RecordingBackend::default());
        let err = executor(backend)
            .execute(&action(ActionKind::CalendarSync))
            .await
            .unwrap_err();

        match err {
            ExecutorError::Guard(GuardError::Downstream { attempts, message }) => {
                assert_eq!(attempts, 1);
                assert!(message.contains("calendar unreachable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_kinds() {
        let exec = executor(Arc::new(RecordingBackend::default()));
        assert_eq!(exec.name(), "tool");
        assert!(exec.kinds().contains(&ActionKind::CalendarSync));
        assert!(!exec.kinds().contains(&ActionKind::SendReminder));
    }
}
