//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary of the order and account lifecycle.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AccountId, OrderId, UnsubscribeToken};
pub use state_machine::{StateMachine, TransitionPlan};
pub use timestamp::Timestamp;
