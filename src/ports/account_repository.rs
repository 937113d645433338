//! Account repository port.
//!
//! Inserts and deletes append a change record to the account change feed
//! in the same write, so every stored change is eventually seen by the
//! change processor.

use async_trait::async_trait;

use crate::domain::account::{Account, Recipient};
use crate::domain::foundation::{AccountId, DomainError, Timestamp};

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An account with this id exists; nothing was written.
    AlreadyExists,
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Inserts the account unless its id is taken, emitting `INSERT` on success.
    async fn insert(&self, account: &Account) -> Result<InsertOutcome, DomainError>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError>;

    /// Replaces the recipient list if the stored version equals `expected_version`,
    /// bumping the version. Returns `false` on a version mismatch or missing account.
    async fn update_recipients(
        &self,
        id: &AccountId,
        recipients: &[Recipient],
        expected_version: u64,
    ) -> Result<bool, DomainError>;

    /// Deletes the account, emitting `REMOVE`. Returns `false` if it was absent.
    async fn delete(&self, id: &AccountId) -> Result<bool, DomainError>;

    /// Accounts whose expiry is at or before `now`.
    async fn find_expired(&self, now: Timestamp, limit: u32) -> Result<Vec<AccountId>, DomainError>;

    /// Accounts left with no recipients whose address has not yet been
    /// released from the mail route, in id order.
    async fn find_without_recipients(&self, limit: u32) -> Result<Vec<AccountId>, DomainError>;

    /// Records that the emptied account's address is off the mail route, so
    /// later sweeps skip it.
    async fn mark_route_released(&self, id: &AccountId) -> Result<(), DomainError>;
}
