//! Account domain - provisioned forwarding addresses.

mod aggregate;
mod errors;
mod snapshot;

pub use aggregate::{Account, MailDomain, Recipient};
pub use errors::AccountError;
pub use snapshot::{AccountSnapshot, RecipientSnapshot, SnapshotError};
