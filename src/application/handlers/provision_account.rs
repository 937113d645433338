//! AccountProvisioner - stores the account a succeeded order paid for.
//!
//! Shared by the webhook processor and the reconciliation sweep. The account
//! id was reserved on the order when it settled, so running this twice for
//! the same order finds the first account instead of creating a second one.

use std::sync::Arc;

use crate::domain::account::Account;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::domain::order::{Order, OrderState};
use crate::ports::{AccountRepository, InsertOutcome, OrderRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created(AccountId),
    /// The account already existed; the order is now marked provisioned.
    AlreadyPresent(AccountId),
}

impl ProvisionOutcome {
    pub fn account_id(&self) -> &AccountId {
        match self {
            ProvisionOutcome::Created(id) | ProvisionOutcome::AlreadyPresent(id) => id,
        }
    }
}

#[derive(Clone)]
pub struct AccountProvisioner {
    orders: Arc<dyn OrderRepository>,
    accounts: Arc<dyn AccountRepository>,
}

impl AccountProvisioner {
    pub fn new(orders: Arc<dyn OrderRepository>, accounts: Arc<dyn AccountRepository>) -> Self {
        Self { orders, accounts }
    }

    pub async fn provision(&self, order: &Order) -> Result<ProvisionOutcome, DomainError> {
        if order.state != OrderState::Succeeded {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("order {} is {}, not succeeded", order.id, order.state),
            ));
        }
        let account_id = order.account_id.clone().ok_or_else(|| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("succeeded order {} has no reserved account id", order.id),
            )
        })?;

        let account = Account::provision(account_id.clone(), &order.recipients, order.weeks, Timestamp::now());
        let created = match self.accounts.insert(&account).await? {
            InsertOutcome::Inserted => true,
            InsertOutcome::AlreadyExists => false,
        };

        self.orders.mark_provisioned(&order.id).await?;

        tracing::info!(
            order_id = %order.id,
            account_id = %account_id,
            recipients = order.recipients.len(),
            weeks = order.weeks,
            created,
            "Account provisioned"
        );
        Ok(if created {
            ProvisionOutcome::Created(account_id)
        } else {
            ProvisionOutcome::AlreadyPresent(account_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAccountStore, InMemoryOrderRepository};
    use crate::domain::foundation::OrderId;
    use crate::domain::order::{OrderRequest, Price};

    async fn succeeded_order(orders: &InMemoryOrderRepository) -> Order {
        let order = Order::pending(
            OrderId::new("cs_1").unwrap(),
            OrderRequest::new(vec!["a@x.com".into(), "b@x.com".into()], 3).unwrap(),
            Price {
                amount_minor: 500,
                currency: "usd".into(),
            },
            Timestamp::now(),
        );
        orders.save(&order).await.unwrap();
        orders
            .compare_and_set_state(&order.id, OrderState::Pending, OrderState::Succeeded, Some(AccountId::new()))
            .await
            .unwrap();
        orders.find_by_id(&order.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn creates_account_with_order_recipients() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let accounts = Arc::new(InMemoryAccountStore::new());
        let provisioner = AccountProvisioner::new(orders.clone(), accounts.clone());
        let order = succeeded_order(&orders).await;

        let outcome = provisioner.provision(&order).await.unwrap();
        assert_eq!(outcome, ProvisionOutcome::Created(order.account_id.clone().unwrap()));

        let stored = accounts.accounts().await;
        assert_eq!(stored.len(), 1);
        let addresses: Vec<_> = stored[0].recipients.iter().map(|r| r.address.clone()).collect();
        assert_eq!(addresses, order.recipients);

        let reloaded = orders.find_by_id(&order.id).await.unwrap().unwrap();
        assert!(reloaded.account_provisioned);
    }

    #[tokio::test]
    async fn second_run_finds_existing_account() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let accounts = Arc::new(InMemoryAccountStore::new());
        let provisioner = AccountProvisioner::new(orders.clone(), accounts.clone());
        let order = succeeded_order(&orders).await;

        provisioner.provision(&order).await.unwrap();
        let again = provisioner.provision(&order).await.unwrap();

        assert!(matches!(again, ProvisionOutcome::AlreadyPresent(_)));
        assert_eq!(accounts.accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn refuses_orders_that_did_not_succeed() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let accounts = Arc::new(InMemoryAccountStore::new());
        let provisioner = AccountProvisioner::new(orders.clone(), accounts.clone());
        let mut order = succeeded_order(&orders).await;
        order.state = OrderState::Cancelled;

        assert!(provisioner.provision(&order).await.is_err());
        assert!(accounts.accounts().await.is_empty());
    }
}
