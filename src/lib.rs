//! Pooled Inbox - paid, time-limited shared email addresses.
//!
//! A buyer pays for an address under the service domain; mail sent to it is
//! forwarded to the recipients listed on the order until the paid period
//! ends or every recipient has unsubscribed. The crate coordinates the
//! payment lifecycle, account provisioning, the shared inbound mail route
//! and intro notifications.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
