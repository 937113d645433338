//! UnsubscribeService - removes one recipient from an account by token.

use std::sync::Arc;

use crate::application::mail_route_sync::MailRouteSyncHandle;
use crate::domain::account::{AccountError, MailDomain};
use crate::domain::foundation::{AccountId, UnsubscribeToken};
use crate::ports::AccountRepository;

/// Version-check retries before giving up on a contended account.
const MAX_UPDATE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Removed { remaining: usize },
    /// That was the last recipient; the address has been taken off the route.
    RemovedLast,
}

pub struct UnsubscribeService {
    accounts: Arc<dyn AccountRepository>,
    routes: MailRouteSyncHandle,
    domain: MailDomain,
}

impl UnsubscribeService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        routes: MailRouteSyncHandle,
        domain: MailDomain,
    ) -> Self {
        Self {
            accounts,
            routes,
            domain,
        }
    }

    /// Removes the recipient holding `token`.
    ///
    /// A second call with the same token finds nothing and returns
    /// `RecipientNotFound`. When the account ends up empty its address is
    /// deactivated; if that fails the reconciliation sweep finishes it.
    pub async fn unsubscribe(
        &self,
        account_id: &AccountId,
        token: &UnsubscribeToken,
    ) -> Result<UnsubscribeOutcome, AccountError> {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut account = self
                .accounts
                .find_by_id(account_id)
                .await?
                .ok_or_else(|| AccountError::not_found(account_id.clone()))?;

            account.remove_recipient(token)?;

            let written = self
                .accounts
                .update_recipients(account_id, &account.recipients, account.version)
                .await?;
            if !written {
                tracing::warn!(account_id = %account_id, attempt, "Account changed during unsubscribe, retrying");
                continue;
            }

            tracing::info!(
                account_id = %account_id,
                remaining = account.recipients.len(),
                "Recipient unsubscribed"
            );

            if account.has_recipients() {
                return Ok(UnsubscribeOutcome::Removed {
                    remaining: account.recipients.len(),
                });
            }

            let address = self.domain.address_for(account_id);
            match self.routes.deactivate(&address).await {
                Ok(_) => {
                    if let Err(e) = self.accounts.mark_route_released(account_id).await {
                        tracing::warn!(account_id = %account_id, error = %e, "Could not record released route");
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        account_id = %account_id,
                        error = %e,
                        "Deactivating emptied account failed, leaving it to the sweep"
                    );
                }
            }
            return Ok(UnsubscribeOutcome::RemovedLast);
        }

        Err(AccountError::ConcurrentModification(account_id.clone()))
    }
}
