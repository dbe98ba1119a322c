//! Action state machine with validated transitions.
//!
//! Pending -> InProgress -> Completed/Failed
//! Pending -> Cancelled
//! Pending -> Failed (kind has no executor)

use crate::error::PlannerError;
use crate::types::ActionStatus;

/// Validate that a status transition is allowed.
///
/// Terminal states have no outgoing transitions. In particular there is no
/// way back to Pending, so a failed action is never requeued.
pub fn validate_transition(from: ActionStatus, to: ActionStatus) -> Result<(), PlannerError> {
    let valid = matches!(
        (from, to),
        (ActionStatus::Pending, ActionStatus::InProgress)
            | (ActionStatus::Pending, ActionStatus::Cancelled)
            | (ActionStatus::Pending, ActionStatus::Failed)
            | (ActionStatus::InProgress, ActionStatus::Completed)
            | (ActionStatus::InProgress, ActionStatus::Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(PlannerError::InvalidTransition(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ActionStatus; 5] = [
        ActionStatus::Pending,
        ActionStatus::InProgress,
        ActionStatus::Completed,
        ActionStatus::Failed,
        ActionStatus::Cancelled,
    ];

    #[test]
    fn test_valid_transitions() {
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::InProgress).is_ok());
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::Cancelled).is_ok());
        assert!(validate_transition(ActionStatus::Pending, ActionStatus::Failed).is_ok());
        assert!(validate_transition(ActionStatus::InProgress, ActionStatus::Completed).is_ok());
        assert!(validate_transition(ActionStatus::InProgress, ActionStatus::Failed).is_ok());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(
                    validate_transition(from, to).is_err(),
                    "{} -> {} should be rejected",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_in_progress_cannot_be_cancelled_or_requeued() {
        assert!(validate_transition(ActionStatus::InProgress, ActionStatus::Cancelled).is_err());
        assert!(validate_transition(ActionStatus::InProgress, ActionStatus::Pending).is_err());
    }

    #[test]
    fn test_pending_cannot_complete_directly() {
        let err = validate_transition(ActionStatus::Pending, ActionStatus::Completed).unwrap_err();
        assert_eq!(err.to_string(), "Invalid state transition: pending -> completed");
    }
}
