//! Account aggregate - a provisioned forwarding address and its recipients.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Timestamp, UnsubscribeToken};

use super::errors::AccountError;

/// One forwarding destination of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,
    pub unsubscribe_token: UnsubscribeToken,
}

impl Recipient {
    /// Creates a recipient with a freshly generated token.
    pub fn issue(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            unsubscribe_token: UnsubscribeToken::generate(),
        }
    }
}

/// A provisioned account.
///
/// Created with its full recipient set. Recipients only shrink afterwards;
/// tokens are never reissued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub recipients: Vec<Recipient>,
    pub expires_at: Timestamp,
    /// Bumped on every recipient change; used for conditional updates.
    pub version: u64,
}

impl Account {
    /// Builds a new account for a paid order, valid for `weeks` from `now`.
    pub fn provision(id: AccountId, addresses: &[String], weeks: u32, now: Timestamp) -> Self {
        Self {
            id,
            recipients: addresses.iter().map(Recipient::issue).collect(),
            expires_at: now.add_weeks(weeks),
            version: 1,
        }
    }

    pub fn is_expired(&self, now: &Timestamp) -> bool {
        !self.expires_at.is_after(now)
    }

    pub fn has_recipients(&self) -> bool {
        !self.recipients.is_empty()
    }

    /// Removes the recipient holding `token` and returns it.
    pub fn remove_recipient(
        &mut self,
        token: &UnsubscribeToken,
    ) -> Result<Recipient, AccountError> {
        let position = self
            .recipients
            .iter()
            .position(|r| &r.unsubscribe_token == token)
            .ok_or_else(|| AccountError::recipient_not_found(self.id.clone()))?;
        Ok(self.recipients.remove(position))
    }
}

/// Domain under which account addresses are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailDomain(String);

impl MailDomain {
    pub fn new(domain: impl Into<String>) -> Self {
        Self(domain.into().trim().trim_start_matches('@').to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public address of an account: `{id}@{domain}`.
    pub fn address_for(&self, id: &AccountId) -> String {
        format!("{}@{}", id, self.0)
    }

    /// Address on this domain for an arbitrary local part.
    pub fn mailbox(&self, local_part: &str) -> String {
        format!("{}@{}", local_part, self.0)
    }
}
