//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `postgres` - durable storage for orders, accounts, routes and the dedup ledger
//! - `memory` - in-process implementations of every storage and mail port
//! - `stripe` - hosted checkout sessions
//! - `email` - Resend batch mailer
//! - `http` - axum REST surface
//! - `workers` - background poll loops

pub mod email;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
pub mod workers;

pub use workers::{ChangeFeedPoller, ChangeFeedPollerConfig, PeriodicJob, PeriodicWorker};
