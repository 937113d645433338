//! PostgreSQL implementation of OrderRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, OrderId, Timestamp};
use crate::domain::order::{Order, OrderState, Price};
use crate::ports::OrderRepository;

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    state: String,
    recipients: Json<Vec<String>>,
    weeks: i32,
    amount_minor: i64,
    currency: String,
    account_id: Option<String>,
    account_provisioned: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let state: OrderState = row.state.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid order state: {}", e))
        })?;
        let weeks = u32::try_from(row.weeks).map_err(|_| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid weeks value: {}", row.weeks))
        })?;

        let account_id = row
            .account_id
            .map(AccountId::parse)
            .transpose()
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid account id: {}", e))
            })?;

        Ok(Order {
            id: OrderId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid order id: {}", e))
            })?,
            price: Price {
                amount_minor: row.amount_minor,
                currency: row.currency,
            },
            state,
            recipients: row.recipients.0,
            weeks,
            account_id,
            account_provisioned: row.account_provisioned,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_ORDER: &str = r#"
    SELECT id, state, recipients, weeks, amount_minor, currency,
           account_id, account_provisioned, created_at, updated_at
    FROM orders
"#;

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, state, recipients, weeks, amount_minor, currency,
                account_id, account_provisioned, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_str())
        .bind(order.state.as_str())
        .bind(Json(&order.recipients))
        .bind(order.weeks as i32)
        .bind(order.price.amount_minor)
        .bind(&order.price.currency)
        .bind(order.account_id.as_ref().map(AccountId::as_str))
        .bind(order.account_provisioned)
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save order", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_ORDER))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to find order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn compare_and_set_state(
        &self,
        id: &OrderId,
        expected: OrderState,
        next: OrderState,
        account_id: Option<AccountId>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                state = $3,
                account_id = COALESCE($4, account_id),
                updated_at = NOW()
            WHERE id = $1 AND state = $2
            "#,
        )
        .bind(id.as_str())
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(account_id.as_ref().map(AccountId::as_str))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update order state", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_provisioned(&self, id: &OrderId) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE orders SET account_provisioned = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark order provisioned", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::OrderNotFound,
                format!("order {} not found", id),
            ));
        }
        Ok(())
    }

    async fn find_awaiting_provisioning(&self, limit: u32) -> Result<Vec<Order>, DomainError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{} WHERE state = 'succeeded' AND NOT account_provisioned ORDER BY created_at LIMIT $1",
            SELECT_ORDER
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list unprovisioned orders", e))?;

        rows.into_iter().map(Order::try_from).collect()
    }
}
