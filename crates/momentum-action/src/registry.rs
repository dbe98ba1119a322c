//! In-memory action registry.
//!
//! Owns every action the planner knows about, keyed by id and indexed by
//! owner. All lifecycle changes go through [`validate_transition`] while the
//! registry lock is held, so a status check and the change it guards are
//! atomic with respect to concurrent dispatch, cancel and cleanup calls.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use momentum_core::error::MomentumError;

use crate::error::PlannerError;
use crate::state_machine::validate_transition;
use crate::types::{Action, ActionStatus, NewAction, StatusCounts};

#[derive(Default)]
struct RegistryState {
    actions: HashMap<Uuid, Action>,
    /// Insertion-ordered ids per owner.
    owners: HashMap<String, Vec<Uuid>>,
    next_sequence: u64,
}

impl RegistryState {
    fn is_ready(&self, action: &Action, now: DateTime<Utc>) -> bool {
        action.is_eligible(now)
            && action.dependencies.iter().all(|dep| {
                self.actions
                    .get(dep)
                    .is_some_and(|a| a.status == ActionStatus::Completed)
            })
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Action, PlannerError> {
        self.actions.get_mut(&id).ok_or(PlannerError::NotFound(id))
    }
}

/// Thread-safe store of actions and their lifecycle.
#[derive(Default)]
pub struct ActionRegistry {
    state: Mutex<RegistryState>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, PlannerError> {
        self.state.lock().map_err(|e| {
            PlannerError::Storage(MomentumError::Storage(format!("Lock poisoned: {}", e)))
        })
    }

    /// Register a new pending action.
    pub fn insert(
        &self,
        new: NewAction,
        default_max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<Action, PlannerError> {
        let mut state = self.lock()?;
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let mut dependencies: Vec<Uuid> = Vec::with_capacity(new.dependencies.len());
        for dep in new.dependencies {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        let action = Action {
            id: Uuid::new_v4(),
            kind: new.kind,
            priority: new.priority,
            owner: new.owner,
            parameters: new.parameters,
            dependencies,
            not_before: new.not_before,
            status: ActionStatus::Pending,
            attempts: 0,
            max_attempts: new.max_attempts.unwrap_or(default_max_attempts),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            execution_duration: None,
            sequence,
        };

        state
            .owners
            .entry(action.owner.clone())
            .or_default()
            .push(action.id);
        state.actions.insert(action.id, action.clone());
        Ok(action)
    }

    pub fn get(&self, id: Uuid) -> Result<Action, PlannerError> {
        let state = self.lock()?;
        state.actions.get(&id).cloned().ok_or(PlannerError::NotFound(id))
    }

    /// Ready actions in dispatch order: priority rank, then creation time,
    /// then insertion sequence.
    pub fn list_ready(&self, owner: Option<&str>, now: DateTime<Utc>) -> Vec<Action> {
        let state = match self.state.lock() {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let mut ready: Vec<Action> = state
            .actions
            .values()
            .filter(|a| owner.is_none_or(|o| a.owner == o))
            .filter(|a| state.is_ready(a, now))
            .cloned()
            .collect();

        ready.sort_by_key(|a| (a.priority, a.created_at, a.sequence));
        ready
    }

    /// All actions for `owner`, in creation order.
    pub fn for_owner(&self, owner: &str) -> Vec<Action> {
        let state = match self.state.lock() {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        state
            .owners
            .get(owner)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.actions.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Move a ready action to InProgress and count the attempt.
    ///
    /// Readiness is re-checked under the lock; an action cancelled or claimed
    /// since it was listed yields [`PlannerError::NotReady`].
    pub fn claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<Action, PlannerError> {
        let mut state = self.lock()?;
        let ready = {
            let action = state.actions.get(&id).ok_or(PlannerError::NotFound(id))?;
            state.is_ready(action, now)
        };
        if !ready {
            return Err(PlannerError::NotReady(id));
        }

        let action = state.get_mut(id)?;
        validate_transition(action.status, ActionStatus::InProgress)?;
        action.status = ActionStatus::InProgress;
        action.attempts += 1;
        action.updated_at = now;
        Ok(action.clone())
    }

    /// Record the outcome of an executor run.
    pub fn finish(
        &self,
        id: Uuid,
        outcome: Result<serde_json::Value, String>,
        elapsed: Duration,
        now: DateTime<Utc>,
    ) -> Result<Action, PlannerError> {
        let mut state = self.lock()?;
        let action = state.get_mut(id)?;

        let next = match outcome {
            Ok(_) => ActionStatus::Completed,
            Err(_) => ActionStatus::Failed,
        };
        validate_transition(action.status, next)?;

        action.status = next;
        match outcome {
            Ok(value) => action.result = Some(value),
            Err(message) => action.error = Some(message),
        }
        action.execution_duration = Some(elapsed);
        action.updated_at = now;
        Ok(action.clone())
    }

    /// Fail a pending action without running it. The attempt counter is left
    /// untouched since nothing was executed.
    pub fn fail_without_executor(
        &self,
        id: Uuid,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<Action, PlannerError> {
        let mut state = self.lock()?;
        let action = state.get_mut(id)?;
        validate_transition(action.status, ActionStatus::Failed)?;
        action.status = ActionStatus::Failed;
        action.error = Some(message);
        action.updated_at = now;
        Ok(action.clone())
    }

    /// Cancel a pending action. Returns false for unknown ids and for actions
    /// in any other state.
    pub fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> bool {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(_) => return false,
        };

        match state.actions.get_mut(&id) {
            Some(action) if validate_transition(action.status, ActionStatus::Cancelled).is_ok() => {
                action.status = ActionStatus::Cancelled;
                action.updated_at = now;
                true
            }
            _ => false,
        }
    }

    /// Remove terminal actions last updated before `cutoff`.
    pub fn cleanup(&self, cutoff: DateTime<Utc>) -> usize {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(_) => return 0,
        };

        let expired: Vec<(Uuid, String)> = state
            .actions
            .values()
            .filter(|a| a.status.is_terminal() && a.updated_at < cutoff)
            .map(|a| (a.id, a.owner.clone()))
            .collect();

        for (id, owner) in &expired {
            state.actions.remove(id);
            if let Some(ids) = state.owners.get_mut(owner) {
                ids.retain(|x| x != id);
                if ids.is_empty() {
                    state.owners.remove(owner);
                }
            }
        }

        expired.len()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        if let Ok(state) = self.state.lock() {
            for action in state.actions.values() {
                counts.add(action.status);
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.actions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
