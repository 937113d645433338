//! PostgreSQL adapters - database implementations of the storage ports.
//!
//! - `PostgresOrderRepository` - orders with conditional state updates
//! - `PostgresAccountStore` - accounts plus their change feed, written transactionally
//! - `PostgresMailRouteStore` - versioned allow-list rows
//! - `PostgresProcessedEventStore` - side-effect dedup ledger
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod account_store;
mod mail_route_store;
mod order_repository;
mod processed_event_store;

pub use account_store::PostgresAccountStore;
pub use mail_route_store::PostgresMailRouteStore;
pub use order_repository::PostgresOrderRepository;
pub use processed_event_store::PostgresProcessedEventStore;
