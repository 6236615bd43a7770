//! Work-order state machine: guarded lifecycle transitions.
//!
//! `accept`, `check_in` and `start` carry no checklist logic — each is a
//! guarded state change, illegal unless the current status matches the
//! expected predecessor. Closure itself goes through the gate and is the
//! only path into a terminal success state.

use liftops_types::{ChecklistError, ChecklistResult, TransitionAction, WorkOrderStatus};

/// Resolve the successor status for an action, or refuse the transition.
///
/// `RequestClose` is not resolved here: its successor depends on the gate
/// verdict and the signature requirement.
pub fn next_status(
    action: TransitionAction,
    current: WorkOrderStatus,
) -> ChecklistResult<WorkOrderStatus> {
    use TransitionAction as A;
    use WorkOrderStatus as S;

    match (action, current) {
        (A::Accept, S::New) => Ok(S::EnRoute),
        (A::CheckIn, S::EnRoute) => Ok(S::CheckedIn),
        (A::Start, S::CheckedIn) => Ok(S::InProgress),
        (A::Sign, S::AwaitingSignature) => Ok(S::Completed),
        (A::Cancel, current) if current.is_active() => Ok(S::Canceled),
        (action, current) => Err(ChecklistError::InvalidTransition(format!(
            "{action:?} is not legal from {current:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_order() {
        let mut status = WorkOrderStatus::New;
        for action in [
            TransitionAction::Accept,
            TransitionAction::CheckIn,
            TransitionAction::Start,
        ] {
            status = next_status(action, status).unwrap();
        }
        assert_eq!(status, WorkOrderStatus::InProgress);
    }

    #[test]
    fn test_skipping_a_predecessor_is_refused() {
        // Cannot start before checking in
        let result = next_status(TransitionAction::Start, WorkOrderStatus::EnRoute);
        assert!(matches!(result, Err(ChecklistError::InvalidTransition(_))));

        // Cannot check in before accepting
        let result = next_status(TransitionAction::CheckIn, WorkOrderStatus::New);
        assert!(matches!(result, Err(ChecklistError::InvalidTransition(_))));
    }

    #[test]
    fn test_sign_only_from_awaiting_signature() {
        assert_eq!(
            next_status(TransitionAction::Sign, WorkOrderStatus::AwaitingSignature).unwrap(),
            WorkOrderStatus::Completed
        );
        let result = next_status(TransitionAction::Sign, WorkOrderStatus::InProgress);
        assert!(matches!(result, Err(ChecklistError::InvalidTransition(_))));
    }

    #[test]
    fn test_cancel_from_any_active_state() {
        for status in [
            WorkOrderStatus::New,
            WorkOrderStatus::EnRoute,
            WorkOrderStatus::CheckedIn,
            WorkOrderStatus::InProgress,
            WorkOrderStatus::AwaitingSignature,
        ] {
            assert_eq!(
                next_status(TransitionAction::Cancel, status).unwrap(),
                WorkOrderStatus::Canceled
            );
        }
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        for status in [WorkOrderStatus::Completed, WorkOrderStatus::Canceled] {
            for action in [
                TransitionAction::Accept,
                TransitionAction::CheckIn,
                TransitionAction::Start,
                TransitionAction::Sign,
                TransitionAction::Cancel,
            ] {
                assert!(next_status(action, status).is_err());
            }
        }
    }
}
