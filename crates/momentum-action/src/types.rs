//! Core types and value objects for the action planner.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// What an action does; each kind maps to exactly one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Breakdown,
    Analysis,
    Motivation,
    ProofValidation,
    ScheduleTask,
    StartSession,
    SendReminder,
    UpdateMood,
    AwardPoints,
    PlayRitual,
    CalendarSync,
}

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        ActionKind::Breakdown,
        ActionKind::Analysis,
        ActionKind::Motivation,
        ActionKind::ProofValidation,
        ActionKind::ScheduleTask,
        ActionKind::StartSession,
        ActionKind::SendReminder,
        ActionKind::UpdateMood,
        ActionKind::AwardPoints,
        ActionKind::PlayRitual,
        ActionKind::CalendarSync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Breakdown => "breakdown",
            ActionKind::Analysis => "analysis",
            ActionKind::Motivation => "motivation",
            ActionKind::ProofValidation => "proof_validation",
            ActionKind::ScheduleTask => "schedule_task",
            ActionKind::StartSession => "start_session",
            ActionKind::SendReminder => "send_reminder",
            ActionKind::UpdateMood => "update_mood",
            ActionKind::AwardPoints => "award_points",
            ActionKind::PlayRitual => "play_ritual",
            ActionKind::CalendarSync => "calendar_sync",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown action kind: {}", s))
    }
}

/// Dispatch rank. Declaration order is the rank: critical sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// Action lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl ActionStatus {
    /// Completed, failed and cancelled never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Completed | ActionStatus::Failed | ActionStatus::Cancelled
        )
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Pending => write!(f, "pending"),
            ActionStatus::InProgress => write!(f, "in_progress"),
            ActionStatus::Completed => write!(f, "completed"),
            ActionStatus::Failed => write!(f, "failed"),
            ActionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActionStatus::Pending),
            "in_progress" => Ok(ActionStatus::InProgress),
            "completed" => Ok(ActionStatus::Completed),
            "failed" => Ok(ActionStatus::Failed),
            "cancelled" => Ok(ActionStatus::Cancelled),
            _ => Err(format!("Unknown action status: {}", s)),
        }
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub kind: ActionKind,
    pub priority: Priority,
    pub owner: String,
    pub parameters: serde_json::Value,
    pub dependencies: Vec<Uuid>,
    pub not_before: Option<DateTime<Utc>>,
    pub status: ActionStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "execution_duration_ms", with = "duration_millis")]
    pub execution_duration: Option<Duration>,
    /// Registry insertion counter; breaks `created_at` ties in dispatch order.
    pub sequence: u64,
}

impl Action {
    /// Readiness checks that need nothing but the action itself.
    ///
    /// Dependencies are resolved by the registry.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == ActionStatus::Pending
            && self.attempts < self.max_attempts
            && self.not_before.is_none_or(|at| at <= now)
    }

    /// Key under which the audit snapshot is stored.
    pub fn memory_key(&self) -> String {
        format!("action_result:{}", self.id)
    }
}

/// Caller-supplied fields for a new action.
#[derive(Debug, Clone)]
pub struct NewAction {
    pub kind: ActionKind,
    pub priority: Priority,
    pub owner: String,
    pub parameters: serde_json::Value,
    pub dependencies: Vec<Uuid>,
    pub not_before: Option<DateTime<Utc>>,
    /// Falls back to the planner's configured default when `None`.
    pub max_attempts: Option<u32>,
}

impl NewAction {
    pub fn new(kind: ActionKind, priority: Priority, owner: impl Into<String>) -> Self {
        Self {
            kind,
            priority,
            owner: owner.into(),
            parameters: serde_json::Value::Object(Default::default()),
            dependencies: Vec::new(),
            not_before: None,
            max_attempts: None,
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn depends_on(mut self, dependencies: impl IntoIterator<Item = Uuid>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// How one dispatched action ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub id: Uuid,
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub error: Option<String>,
}

/// Summary of one `dispatch` pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Actions handed to an executor.
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
    /// Actions failed immediately because their kind has no executor. These
    /// are also counted in `failed`.
    pub no_executor: usize,
    /// In the order the actions were taken from the ready list. Empty for
    /// detached dispatch.
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    /// True when the pass took no action at all.
    pub fn is_empty(&self) -> bool {
        self.dispatched == 0 && self.no_executor == 0
    }

    pub(crate) fn record(&mut self, action: &Action) {
        match action.status {
            ActionStatus::Completed => self.completed += 1,
            ActionStatus::Failed => self.failed += 1,
            _ => {}
        }
        self.outcomes.push(DispatchOutcome {
            id: action.id,
            kind: action.kind,
            status: action.status,
            error: action.error.clone(),
        });
    }
}

/// Number of registered actions per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub(crate) fn add(&mut self, status: ActionStatus) {
        match status {
            ActionStatus::Pending => self.pending += 1,
            ActionStatus::InProgress => self.in_progress += 1,
            ActionStatus::Completed => self.completed += 1,
            ActionStatus::Failed => self.failed += 1,
            ActionStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed + self.failed + self.cancelled
    }
}

/// Planner observability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannerStats {
    pub counts: StatusCounts,
    pub executing: usize,
    pub available_slots: usize,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_action() -> Action {
        let now = Utc::now();
        Action {
            id: Uuid::new_v4(),
            kind: ActionKind::Breakdown,
            priority: Priority::Medium,
            owner: "alice".to_string(),
            parameters: serde_json::json!({"task": "write report"}),
            dependencies: vec![],
            not_before: None,
            status: ActionStatus::Pending,
            attempts: 0,
            max_attempts: 3,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            execution_duration: None,
            sequence: 0,
        }
    }

    #[test]
    fn test_action_kind_display_and_parse() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.to_string().parse::<ActionKind>().unwrap(), kind);
        }
        assert_eq!(ActionKind::ProofValidation.to_string(), "proof_validation");
        assert_eq!(ActionKind::CalendarSync.to_string(), "calendar_sync");
        assert!("teleport".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_action_kind_serde_matches_display() {
        for kind in ActionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_priority_rank_order() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);

        let mut ps = vec![Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        ps.sort();
        assert_eq!(
            ps,
            vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ActionStatus::Pending.is_terminal());
        assert!(!ActionStatus::InProgress.is_terminal());
        assert!(ActionStatus::Completed.is_terminal());
        assert!(ActionStatus::Failed.is_terminal());
        assert!(ActionStatus::Cancelled.is_terminal());
        assert_eq!(ActionStatus::InProgress.to_string(), "in_progress");
        assert_eq!(
            "in_progress".parse::<ActionStatus>().unwrap(),
            ActionStatus::InProgress
        );
    }

    #[test]
    fn test_is_eligible() {
        let now = Utc::now();
        let mut action = sample_action();
        assert!(action.is_eligible(now));

        action.not_before = Some(now + chrono::Duration::minutes(5));
        assert!(!action.is_eligible(now));
        assert!(action.is_eligible(now + chrono::Duration::minutes(5)));

        action.not_before = None;
        action.attempts = 3;
        assert!(!action.is_eligible(now));

        action.attempts = 0;
        action.status = ActionStatus::Cancelled;
        assert!(!action.is_eligible(now));
    }

    #[test]
    fn test_action_serializes_duration_as_millis() {
        let mut action = sample_action();
        action.execution_duration = Some(Duration::from_millis(1500));

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["execution_duration_ms"], 1500);
        assert_eq!(value["status"], "pending");
        assert_eq!(value["kind"], "breakdown");

        let back: Action = serde_json::from_value(value).unwrap();
        assert_eq!(back.execution_duration, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_memory_key() {
        let action = sample_action();
        assert_eq!(action.memory_key(), format!("action_result:{}", action.id));
    }

    #[test]
    fn test_new_action_builder() {
        let dep = Uuid::new_v4();
        let at = Utc::now();
        let new = NewAction::new(ActionKind::SendReminder, Priority::High, "bob")
            .with_parameters(serde_json::json!({"message": "stretch"}))
            .depends_on([dep])
            .not_before(at)
            .max_attempts(5);

        assert_eq!(new.owner, "bob");
        assert_eq!(new.dependencies, vec![dep]);
        assert_eq!(new.not_before, Some(at));
        assert_eq!(new.max_attempts, Some(5));
        assert!(NewAction::new(ActionKind::Analysis, Priority::Low, "x")
            .parameters
            .is_object());
    }

    #[test]
    fn test_status_counts_total() {
        let mut counts = StatusCounts::default();
        counts.add(ActionStatus::Pending);
        counts.add(ActionStatus::Failed);
        counts.add(ActionStatus::Failed);
        assert_eq!(counts.failed, 2);
        assert_eq!(counts.total(), 3);
    }
}
