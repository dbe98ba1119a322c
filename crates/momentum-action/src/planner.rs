//! Action planner.
//!
//! Coordinates the registry, the executor table and the memory store:
//! creates actions, dispatches ready ones under a global concurrency ceiling,
//! and snapshots every terminal transition for audit.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use momentum_core::config::PlannerConfig;
use momentum_storage::MemoryStore;

use crate::error::PlannerError;
use crate::executor::ExecutorTable;
use crate::registry::ActionRegistry;
use crate::types::{Action, ActionStatus, DispatchReport, NewAction, PlannerStats};

/// Deferred-work planner shared by every owner in the process.
pub struct Planner {
    registry: Arc<ActionRegistry>,
    executors: ExecutorTable,
    memory: Arc<dyn MemoryStore>,
    slots: Arc<Semaphore>,
    config: PlannerConfig,
    wake: Arc<Notify>,
    shutdown: Notify,
}

type ActionTask = JoinHandle<Result<Action, PlannerError>>;

impl Planner {
    pub fn new(
        config: PlannerConfig,
        executors: ExecutorTable,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        Self {
            registry: Arc::new(ActionRegistry::new()),
            executors,
            memory,
            slots: Arc::new(Semaphore::new(config.max_concurrent_actions)),
            config,
            wake: Arc::new(Notify::new()),
            shutdown: Notify::new(),
        }
    }

    /// Register a new pending action. Dependencies are not checked for
    /// existence; an unknown id simply never becomes completed.
    pub fn create(&self, new: NewAction) -> Result<Action, PlannerError> {
        let action = self
            .registry
            .insert(new, self.config.default_max_attempts, Utc::now())?;
        debug!(
            action_id = %action.id,
            kind = %action.kind,
            priority = %action.priority,
            owner = %action.owner,
            dependencies = action.dependencies.len(),
            "Action created"
        );
        Ok(action)
    }

    pub fn get(&self, id: Uuid) -> Result<Action, PlannerError> {
        self.registry.get(id)
    }

    /// Ready actions in dispatch order.
    pub fn list_ready(&self, owner: Option<&str>) -> Vec<Action> {
        let ready = self.registry.list_ready(owner, Utc::now());
        debug!(owner = ?owner, ready = ready.len(), "Readiness scan");
        ready
    }

    pub fn actions_for_owner(&self, owner: &str) -> Vec<Action> {
        self.registry.for_owner(owner)
    }

    /// Number of actions currently holding an execution slot.
    pub fn executing(&self) -> usize {
        self.config
            .max_concurrent_actions
            .saturating_sub(self.slots.available_permits())
    }

    /// Dispatch up to `max_actions` ready actions and wait for the batch.
    ///
    /// Slots come from a semaphore shared with every other `dispatch` call,
    /// so the number of in-progress actions never exceeds the configured
    /// ceiling. Actions whose kind has no executor fail immediately without
    /// taking a slot.
    pub async fn dispatch(&self, owner: Option<&str>, max_actions: usize) -> DispatchReport {
        let (mut report, handles) = self.launch(owner, max_actions);

        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(Ok(action)) => report.record(&action),
                Ok(Err(e)) => warn!(error = %e, "Failed to record action outcome"),
                Err(e) => warn!(error = %e, "Dispatch task aborted"),
            }
        }

        report
    }

    /// Start up to `max_actions` ready actions without waiting for them.
    ///
    /// Each task records, logs and snapshots its own outcome and releases
    /// its slot when done. The returned report carries only the
    /// `dispatched` and `no_executor` counts.
    pub fn dispatch_detached(&self, owner: Option<&str>, max_actions: usize) -> DispatchReport {
        let (report, _handles) = self.launch(owner, max_actions);
        report
    }

    /// Claim ready actions and spawn one task per action.
    fn launch(&self, owner: Option<&str>, max_actions: usize) -> (DispatchReport, Vec<ActionTask>) {
        let mut report = DispatchReport::default();
        let budget = max_actions.saturating_sub(self.executing());
        let mut taken = 0;
        let mut handles = Vec::new();

        for action in self.list_ready(owner) {
            if taken >= budget {
                break;
            }

            let Some(executor) = self.executors.resolve(action.kind) else {
                let message = PlannerError::NoExecutor(action.kind).to_string();
                match self
                    .registry
                    .fail_without_executor(action.id, message, Utc::now())
                {
                    Ok(failed) => {
                        warn!(action_id = %failed.id, kind = %failed.kind, "No executor for action");
                        report.no_executor += 1;
                        taken += 1;
                        let memory = Arc::clone(&self.memory);
                        handles.push(tokio::spawn(async move {
                            persist(memory.as_ref(), &failed).await;
                            Ok(failed)
                        }));
                    }
                    Err(e) => debug!(action_id = %action.id, error = %e, "Action changed before it could be failed"),
                }
                continue;
            };

            let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
                debug!("No free execution slot");
                break;
            };

            let claimed = match self.registry.claim(action.id, Utc::now()) {
                Ok(claimed) => claimed,
                Err(e) => {
                    debug!(action_id = %action.id, error = %e, "Action changed before it could be claimed");
                    continue;
                }
            };
            taken += 1;
            report.dispatched += 1;
            info!(
                action_id = %claimed.id,
                kind = %claimed.kind,
                executor = executor.name(),
                attempt = claimed.attempts,
                "Action dispatched"
            );

            let registry = Arc::clone(&self.registry);
            let memory = Arc::clone(&self.memory);
            let wake = Arc::clone(&self.wake);
            handles.push(tokio::spawn(async move {
                let started = Instant::now();
                let outcome = AssertUnwindSafe(executor.execute(&claimed))
                    .catch_unwind()
                    .await;
                let elapsed = started.elapsed();

                let outcome = match outcome {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("executor panicked".to_string()),
                };

                let finished = registry.finish(claimed.id, outcome, elapsed, Utc::now());
                if let Ok(action) = &finished {
                    match action.status {
                        ActionStatus::Completed => info!(
                            action_id = %action.id,
                            kind = %action.kind,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Action completed"
                        ),
                        _ => warn!(
                            action_id = %action.id,
                            kind = %action.kind,
                            error = action.error.as_deref().unwrap_or_default(),
                            "Action failed"
                        ),
                    }
                    persist(memory.as_ref(), action).await;
                }
                drop(permit);
                // A freed slot or a finished dependency may make more work ready.
                wake.notify_one();
                finished
            }));
        }

        (report, handles)
    }

    /// Cancel a pending action. In-progress actions are never interrupted.
    pub fn cancel(&self, id: Uuid) -> bool {
        let cancelled = self.registry.cancel(id, Utc::now());
        if cancelled {
            info!(action_id = %id, "Action cancelled");
        }
        cancelled
    }

    /// Drop terminal actions last updated before `older_than`.
    pub fn cleanup(&self, older_than: chrono::DateTime<Utc>) -> usize {
        let removed = self.registry.cleanup(older_than);
        if removed > 0 {
            info!(removed, "Cleaned up finished actions");
        }
        removed
    }

    /// Cleanup using the configured retention window.
    pub fn cleanup_expired(&self) -> usize {
        let retention =
            chrono::Duration::from_std(self.config.retention()).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(retention)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        self.cleanup(cutoff)
    }

    pub fn stats(&self) -> PlannerStats {
        PlannerStats {
            counts: self.registry.counts(),
            executing: self.executing(),
            available_slots: self.slots.available_permits(),
        }
    }

    /// Run the coordination loop until [`Planner::shutdown`] is called.
    ///
    /// Dispatches on every dispatch tick, [`Planner::notify_ready`] wakeup or
    /// finished action, and cleans up on every cleanup tick. Started actions
    /// run as independent tasks; actions still running at shutdown finish on
    /// their own.
    pub async fn run(&self) {
        let mut dispatch_tick = tokio::time::interval(self.config.dispatch_interval());
        dispatch_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cleanup_tick = tokio::time::interval(self.config.cleanup_interval());
        cleanup_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            max_concurrent = self.config.max_concurrent_actions,
            executors = self.executors.kinds().len(),
            "Planner started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Planner shutting down");
                    return;
                }
                _ = dispatch_tick.tick() => {
                    self.dispatch_pass();
                }
                _ = self.wake.notified() => {
                    self.dispatch_pass();
                }
                _ = cleanup_tick.tick() => {
                    self.cleanup_expired();
                }
            }
        }
    }

    /// One loop pass. Never waits on the actions it starts.
    fn dispatch_pass(&self) {
        let report = self.dispatch_detached(None, self.config.max_concurrent_actions);
        if !report.is_empty() {
            debug!(
                dispatched = report.dispatched,
                no_executor = report.no_executor,
                "Dispatch pass started actions"
            );
        }
    }

    /// Wake the loop for an immediate dispatch pass.
    pub fn notify_ready(&self) {
        self.wake.notify_one();
    }

    /// Signal the loop to stop. Safe to call before `run` starts.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Write the action snapshot. A failed write is logged and otherwise ignored.
async fn persist(memory: &dyn MemoryStore, action: &Action) {
    let value = match serde_json::to_value(action) {
        Ok(v) => v,
        Err(e) => {
            warn!(action_id = %action.id, error = %e, "Failed to serialize action snapshot");
            return;
        }
    };

    if let Err(e) = memory
        .store(&action.memory_key(), value, &action.owner)
        .await
    {
        warn!(action_id = %action.id, error = %e, "Failed to store action snapshot");
    }
}
