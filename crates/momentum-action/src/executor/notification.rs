//! Reminder delivery.
//!
//! Reminders are local, so this executor calls its notifier directly instead
//! of going through the protected call layer.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::ExecutorError;
use crate::executor::{required_str, ActionExecutor};
use crate::types::{Action, ActionKind};

/// Delivers a message to an owner.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner: &str, message: &str) -> Result<(), ExecutorError>;
}

/// Handler for `send_reminder` actions.
pub struct NotificationExecutor {
    notifier: Arc<dyn Notifier>,
}

impl NotificationExecutor {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl ActionExecutor for NotificationExecutor {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn kinds(&self) -> &[ActionKind] {
        &[ActionKind::SendReminder]
    }

    async fn execute(&self, action: &Action) -> Result<serde_json::Value, ExecutorError> {
        let message = required_str(&action.parameters, "message")?;
        self.notifier.notify(&action.owner, message).await?;
        Ok(json!({ "delivered": true, "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionStatus, Priority};
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Inbox {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for Inbox {
        async fn notify(&self, owner: &str, message: &str) -> Result<(), ExecutorError> {
            self.sent
                .lock()
                .unwrap()
                .push((owner.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn reminder(parameters: serde_json::Value) -> Action {
        let now = Utc::now();
        Action {
            id: Uuid::new_v4(),
            kind: ActionKind::SendReminder,
            priority: Priority::High,
            owner: "alice".to_string(),
            parameters,
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

    #[tokio::test]
    async fn test_delivers_message() {
        let inbox = Arc::new(Inbox::default());
        let executor = NotificationExecutor::new(inbox.clone());

        let result = executor
            .execute(&reminder(json!({"message": "Stand up and stretch"})))
            .await
            .unwrap();

        assert_eq!(result["delivered"], true);
        assert_eq!(
            inbox.sent.lock().unwrap()[0],
            ("alice".to_string(), "Stand up and stretch".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let inbox = Arc::new(Inbox::default());
        let executor = NotificationExecutor::new(inbox.clone());

        for params in [json!({"message": ""}), json!({})] {
            let err = executor.execute(&reminder(params)).await.unwrap_err();
            assert!(matches!(err, ExecutorError::InvalidParameters(_)));
        }
        assert!(inbox.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_kinds() {
        let executor = NotificationExecutor::new(Arc::new(Inbox::default()));
        assert_eq!(executor.name(), "notification");
        assert_eq!(executor.kinds(), &[ActionKind::SendReminder]);
    }
}
