//! In-memory order repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, OrderId, Timestamp};
use crate::domain::order::{Order, OrderState};
use crate::ports::OrderRepository;

/// Order storage backed by a map. Used when no database is configured.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn all(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!("order {} already exists", order.id),
            ));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn compare_and_set_state(
        &self,
        id: &OrderId,
        expected: OrderState,
        next: OrderState,
        account_id: Option<AccountId>,
    ) -> Result<bool, DomainError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(id) {
            Some(order) if order.state == expected => {
                order.state = next;
                if account_id.is_some() {
                    order.account_id = account_id;
                }
                order.updated_at = Timestamp::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_provisioned(&self, id: &OrderId) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, format!("order {} not found", id))
        })?;
        order.account_provisioned = true;
        order.updated_at = Timestamp::now();
        Ok(())
    }

    async fn find_awaiting_provisioning(&self, limit: u32) -> Result<Vec<Order>, DomainError> {
        let orders = self.orders.read().await;
        let mut waiting: Vec<Order> = orders
            .values()
            .filter(|o| o.awaits_provisioning())
            .cloned()
            .collect();
        waiting.sort_by_key(|o| o.updated_at);
        waiting.truncate(limit as usize);
        Ok(waiting)
    }
}
