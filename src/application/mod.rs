//! Application layer - command handlers and the mail route actor.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Nothing here knows which adapters sit behind the ports.

pub mod handlers;
pub mod mail_route_sync;

pub use handlers::{
    AccountChangeProcessor, AccountProvisioner, BatchReport, ChangeProcessingError,
    CheckoutSettings, CreateOrderCommand, CreateOrderHandler, CreateOrderResult, ExpiryReaper,
    IntroOutcome, ItemOutcome, NotificationDispatcher, NotificationError, NotificationSettings,
    PaymentWebhookProcessor, ProvisionOutcome, ReconciliationSweep, SweepReport,
    UnsubscribeOutcome, UnsubscribeService, WebhookOutcome,
};
pub use mail_route_sync::{MailRouteError, MailRouteSync, MailRouteSyncHandle, RouteChange};
