//! Order repository port.

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError, OrderId};
use crate::domain::order::{Order, OrderState};

/// Persistence for orders, keyed by checkout reference.
///
/// State changes go through [`compare_and_set_state`](Self::compare_and_set_state)
/// only, so transitions are linearizable per order.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order. Fails if the id already exists.
    async fn save(&self, order: &Order) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Moves the order from `expected` to `next` if and only if its current
    /// state is `expected`, recording `account_id` in the same write.
    ///
    /// Returns `false` when the current state differs or the order is missing.
    async fn compare_and_set_state(
        &self,
        id: &OrderId,
        expected: OrderState,
        next: OrderState,
        account_id: Option<AccountId>,
    ) -> Result<bool, DomainError>;

    /// Records that the order's reserved account has been stored.
    async fn mark_provisioned(&self, id: &OrderId) -> Result<(), DomainError>;

    /// Succeeded orders whose account has not been stored yet, oldest first.
    async fn find_awaiting_provisioning(&self, limit: u32) -> Result<Vec<Order>, DomainError>;
}
