//! Order lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Payment state of an order.
///
/// `Pending` is the only initial state. Every other state is terminal, so
/// a settled order never moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    Succeeded,
    Cancelled,
    Failed,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::Succeeded => "succeeded",
            OrderState::Cancelled => "cancelled",
            OrderState::Failed => "failed",
        }
    }
}

impl StateMachine for OrderState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderState::*;
        matches!(
            (self, target),
            (Pending, Succeeded) | (Pending, Cancelled) | (Pending, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderState::*;
        match self {
            Pending => vec![Succeeded, Cancelled, Failed],
            Succeeded | Cancelled | Failed => vec![],
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderState::Pending),
            "succeeded" => Ok(OrderState::Succeeded),
            "cancelled" => Ok(OrderState::Cancelled),
            "failed" => Ok(OrderState::Failed),
            other => Err(ValidationError::invalid_format(
                "order_state",
                format!("unknown state '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TransitionPlan;
    use proptest::prelude::*;

    const ALL: [OrderState; 4] = [
        OrderState::Pending,
        OrderState::Succeeded,
        OrderState::Cancelled,
        OrderState::Failed,
    ];

    fn any_state() -> impl Strategy<Value = OrderState> {
        prop::sample::select(ALL.to_vec())
    }

    #[test]
    fn pending_is_the_only_non_terminal_state() {
        assert!(!OrderState::Pending.is_terminal());
        assert!(OrderState::Succeeded.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Failed.is_terminal());
    }

    #[test]
    fn string_form_round_trips_for_every_state() {
        for state in ALL {
            assert_eq!(state.as_str().parse::<OrderState>().unwrap(), state);
        }
    }

    #[test]
    fn unknown_state_string_is_rejected() {
        assert!("fulfilled".parse::<OrderState>().is_err());
    }

    proptest! {
        #[test]
        fn transitions_only_leave_pending(from in any_state(), to in any_state()) {
            if from.can_transition_to(&to) {
                prop_assert_eq!(from, OrderState::Pending);
                prop_assert_ne!(to, OrderState::Pending);
            }
        }

        #[test]
        fn any_sequence_of_requests_settles_at_most_once(requests in prop::collection::vec(any_state(), 0..16)) {
            let mut state = OrderState::Pending;
            let mut applied = 0;
            for target in requests {
                match state.plan_transition(target) {
                    TransitionPlan::Apply { to, .. } => {
                        state = to;
                        applied += 1;
                    }
                    TransitionPlan::AlreadyApplied | TransitionPlan::Rejected { .. } => {}
                }
            }
            prop_assert!(applied <= 1);
            if applied == 1 {
                prop_assert!(state.is_terminal());
            }
        }
    }
}
