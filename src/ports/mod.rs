//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `OrderRepository` - Orders with compare-and-set state transitions
//! - `AccountRepository` - Accounts, emitting change records on insert/delete
//! - `ChangeFeed` - At-least-once delivery of account change records
//! - `ProcessedEventStore` - Dedup ledger for non-idempotent side effects
//!
//! ## External Service Ports
//!
//! - `MailRouteStore` - Versioned shared allow-list
//! - `BulkMailer` - Templated bulk email
//! - `PaymentProvider` - Hosted checkout sessions

mod account_repository;
mod bulk_mailer;
mod change_feed;
mod mail_route_store;
mod order_repository;
mod payment_provider;
mod processed_event_store;

pub use account_repository::{AccountRepository, InsertOutcome};
pub use bulk_mailer::{
    BulkDestination, BulkMailer, BulkSendReport, BulkTemplatedMessage, MailError,
    RejectedDestination,
};
pub use change_feed::{ChangeFeed, PendingChange};
pub use mail_route_store::{MailRouteStore, MailRule, RouteList, WriteOutcome};
pub use order_repository::OrderRepository;
pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentErrorCode, PaymentProvider,
};
pub use processed_event_store::ProcessedEventStore;
