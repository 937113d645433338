//! Application handlers.
//!
//! Command handlers and workers' units of work that orchestrate domain
//! operations over ports.

pub mod account_changes;
pub mod create_order;
pub mod payment_webhook;
pub mod provision_account;
pub mod reconcile;
pub mod send_intro;
pub mod unsubscribe;

pub use account_changes::{AccountChangeProcessor, BatchReport, ChangeProcessingError, ItemOutcome};
pub use create_order::{CheckoutSettings, CreateOrderCommand, CreateOrderHandler, CreateOrderResult};
pub use payment_webhook::{PaymentWebhookProcessor, WebhookOutcome};
pub use provision_account::{AccountProvisioner, ProvisionOutcome};
pub use reconcile::{ExpiryReaper, ReconciliationSweep, SweepReport};
pub use send_intro::{
    IntroOutcome, NotificationDispatcher, NotificationError, NotificationSettings, INTRO_HANDLER,
    MAX_DESTINATIONS_PER_CALL,
};
pub use unsubscribe::{UnsubscribeOutcome, UnsubscribeService};
