//! Domain layer - pure business logic with no I/O.

pub mod account;
pub mod change;
pub mod foundation;
pub mod order;
pub mod payment;
