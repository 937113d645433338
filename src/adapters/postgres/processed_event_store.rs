//! PostgreSQL implementation of ProcessedEventStore.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::ProcessedEventStore;

pub struct PostgresProcessedEventStore {
    pool: PgPool,
}

impl PostgresProcessedEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedEventStore for PostgresProcessedEventStore {
    async fn try_claim(&self, key: &str, handler_name: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_key, handler_name)
            VALUES ($1, $2)
            ON CONFLICT (event_key, handler_name) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(handler_name)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to claim event", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, key: &str, handler_name: &str) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM processed_events WHERE event_key = $1 AND handler_name = $2")
            .bind(key)
            .bind(handler_name)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to release event claim", e))?;
        Ok(())
    }
}
