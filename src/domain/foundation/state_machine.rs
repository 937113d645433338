//! State machine trait for lifecycle status enums.
//!
//! Gives every status enum the same vocabulary for validated transitions, and
//! a redelivery-aware `plan_transition` used by handlers that may see the same
//! request more than once.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for OrderState {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Pending, Succeeded) | (Pending, Cancelled) | (Pending, Failed))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![Succeeded, Cancelled, Failed],
///             _ => vec![],
///         }
///     }
/// }
///
/// let next = OrderState::Pending.transition_to(OrderState::Succeeded)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Classifies a requested transition without performing it.
    ///
    /// Asking for the state we are already in is `AlreadyApplied`, never an error.
    fn plan_transition(&self, target: Self) -> TransitionPlan<Self> {
        if *self == target {
            TransitionPlan::AlreadyApplied
        } else if self.can_transition_to(&target) {
            TransitionPlan::Apply { from: *self, to: target }
        } else {
            TransitionPlan::Rejected { current: *self }
        }
    }
}

/// Outcome of [`StateMachine::plan_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan<S> {
    /// The transition is valid and should be applied with a compare-and-set on `from`.
    Apply { from: S, to: S },
    /// Current state already equals the target.
    AlreadyApplied,
    /// Current state forbids the target.
    Rejected { current: S },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Delivery {
        Queued,
        Sent,
        Bounced,
    }

    impl StateMachine for Delivery {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Delivery::*;
            matches!((self, target), (Queued, Sent) | (Queued, Bounced))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Delivery::*;
            match self {
                Queued => vec![Sent, Bounced],
                Sent | Bounced => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(Delivery::Queued.transition_to(Delivery::Sent), Ok(Delivery::Sent));
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        assert!(Delivery::Sent.transition_to(Delivery::Bounced).is_err());
    }

    #[test]
    fn is_terminal_matches_valid_transitions() {
        assert!(!Delivery::Queued.is_terminal());
        assert!(Delivery::Sent.is_terminal());
        assert!(Delivery::Bounced.is_terminal());
    }

    #[test]
    fn plan_transition_same_state_is_already_applied() {
        assert_eq!(
            Delivery::Sent.plan_transition(Delivery::Sent),
            TransitionPlan::AlreadyApplied
        );
    }

    #[test]
    fn plan_transition_valid_returns_apply() {
        assert_eq!(
            Delivery::Queued.plan_transition(Delivery::Bounced),
            TransitionPlan::Apply {
                from: Delivery::Queued,
                to: Delivery::Bounced
            }
        );
    }

    #[test]
    fn plan_transition_from_terminal_is_rejected() {
        assert_eq!(
            Delivery::Bounced.plan_transition(Delivery::Sent),
            TransitionPlan::Rejected {
                current: Delivery::Bounced
            }
        );
    }
}
