//! In-memory adapters.
//!
//! Back every port when no database or mail provider is configured, and
//! serve as the fixtures for unit and integration tests.

mod account_store;
mod mail_route_store;
mod mailer;
mod order_repository;
mod processed_event_store;

pub use account_store::InMemoryAccountStore;
pub use mail_route_store::InMemoryMailRouteStore;
pub use mailer::RecordingMailer;
pub use order_repository::InMemoryOrderRepository;
pub use processed_event_store::InMemoryProcessedEventStore;
