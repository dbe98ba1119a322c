//! Action planner for Momentum.
//!
//! Keeps a registry of deferred actions, works out which ones are ready from
//! their dependencies, priority and schedule, and dispatches them to the
//! executor registered for their kind.

pub mod error;
pub mod executor;
pub mod planner;
pub mod registry;
pub mod state_machine;
pub mod types;

pub use error::{ExecutorError, PlannerError};
pub use executor::{ActionExecutor, ExecutorTable};
pub use planner::Planner;
pub use registry::ActionRegistry;
pub use types::{
    Action, ActionKind, ActionStatus, DispatchOutcome, DispatchReport, NewAction, PlannerStats,
    Priority, StatusCounts,
};
