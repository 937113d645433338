//! Wire form of an account as carried by change records.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::{AccountId, Timestamp, UnsubscribeToken};

use super::aggregate::{Account, Recipient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientSnapshot {
    pub address: String,
    pub unsubscribe_token: String,
}

/// Account snapshot: `{id, recipients: [{address, unsubscribeToken}], expiresAt}`.
///
/// `expiresAt` is unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub id: String,
    pub recipients: Vec<RecipientSnapshot>,
    pub expires_at: i64,
}

/// Why a snapshot could not be turned into an [`Account`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("account id '{0}' is not a valid id")]
    InvalidId(String),

    #[error("recipient {index} has a blank {field}")]
    BlankRecipientField { index: usize, field: &'static str },

    #[error("unsubscribe token issued twice within one account")]
    DuplicateToken,

    #[error("expiresAt {0} is out of range")]
    InvalidExpiry(i64),
}

impl From<&Account> for AccountSnapshot {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            recipients: account
                .recipients
                .iter()
                .map(|r| RecipientSnapshot {
                    address: r.address.clone(),
                    unsubscribe_token: r.unsubscribe_token.as_str().to_string(),
                })
                .collect(),
            expires_at: account.expires_at.as_unix_secs(),
        }
    }
}

impl TryFrom<AccountSnapshot> for Account {
    type Error = SnapshotError;

    fn try_from(snapshot: AccountSnapshot) -> Result<Self, Self::Error> {
        let id: AccountId = snapshot
            .id
            .parse()
            .map_err(|_| SnapshotError::InvalidId(snapshot.id.clone()))?;

        let expires_at = Timestamp::from_unix_secs(snapshot.expires_at)
            .ok_or(SnapshotError::InvalidExpiry(snapshot.expires_at))?;

        let mut seen = HashSet::with_capacity(snapshot.recipients.len());
        let mut recipients = Vec::with_capacity(snapshot.recipients.len());
        for (index, r) in snapshot.recipients.into_iter().enumerate() {
            if r.address.trim().is_empty() {
                return Err(SnapshotError::BlankRecipientField {
                    index,
                    field: "address",
                });
            }
            let token = UnsubscribeToken::new(r.unsubscribe_token).map_err(|_| {
                SnapshotError::BlankRecipientField {
                    index,
                    field: "unsubscribeToken",
                }
            })?;
            if !seen.insert(token.clone()) {
                return Err(SnapshotError::DuplicateToken);
            }
            recipients.push(Recipient {
                address: r.address,
                unsubscribe_token: token,
            });
        }

        Ok(Account {
            id,
            recipients,
            expires_at,
            version: 0,
        })
    }
}
