//! PostgreSQL account store.
//!
//! Implements [`AccountRepository`] and [`ChangeFeed`] over the `accounts`
//! and `account_changes` tables. Inserts and deletes append their change
//! record inside the same transaction as the account write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::account::{Account, Recipient};
use crate::domain::change::ChangeRecord;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::ports::{AccountRepository, ChangeFeed, InsertOutcome, PendingChange};

pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to start transaction", e))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    recipients: Json<Vec<Recipient>>,
    expires_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<AccountRow> for Account {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let version = u64::try_from(row.version).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid account version: {}", row.version),
            )
        })?;
        let id = AccountId::parse(row.id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid account id: {}", e))
        })?;
        Ok(Account {
            id,
            recipients: row.recipients.0,
            expires_at: Timestamp::from_datetime(row.expires_at),
            version,
        })
    }
}

async fn append_change(
    tx: &mut Transaction<'static, Postgres>,
    record: &ChangeRecord,
) -> Result<(), DomainError> {
    sqlx::query("INSERT INTO account_changes (payload) VALUES ($1)")
        .bind(record.to_value())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database("Failed to append account change", e))?;
    Ok(())
}

fn stored_ids(ids: Vec<String>) -> Result<Vec<AccountId>, DomainError> {
    ids.into_iter()
        .map(|id| {
            AccountId::parse(id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid account id: {}", e))
            })
        })
        .collect()
}

#[async_trait]
impl AccountRepository for PostgresAccountStore {
    async fn insert(&self, account: &Account) -> Result<InsertOutcome, DomainError> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (id, recipients, expires_at, version)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(account.id.as_str())
        .bind(Json(&account.recipients))
        .bind(account.expires_at.as_datetime())
        .bind(account.version as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert account", e))?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::AlreadyExists);
        }

        append_change(&mut tx, &ChangeRecord::inserted(account)).await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit account insert", e))?;

        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, recipients, expires_at, version FROM accounts WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find account", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn update_recipients(
        &self,
        id: &AccountId,
        recipients: &[Recipient],
        expected_version: u64,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET recipients = $2, version = version + 1
            WHERE id = $1 AND version = $3
            "#,
        )
        .bind(id.as_str())
        .bind(Json(recipients))
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update recipients", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &AccountId) -> Result<bool, DomainError> {
        let mut tx = self.begin().await?;

        let row: Option<AccountRow> = sqlx::query_as(
            "DELETE FROM accounts WHERE id = $1 RETURNING id, recipients, expires_at, version",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to delete account", e))?;

        let Some(row) = row else {
            return Ok(false);
        };
        let account = Account::try_from(row)?;

        append_change(&mut tx, &ChangeRecord::removed(&account)).await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit account delete", e))?;

        Ok(true)
    }

    async fn find_expired(&self, now: Timestamp, limit: u32) -> Result<Vec<AccountId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM accounts WHERE expires_at <= $1 ORDER BY expires_at LIMIT $2",
        )
        .bind(now.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list expired accounts", e))?;

        stored_ids(ids)
    }

    async fn find_without_recipients(&self, limit: u32) -> Result<Vec<AccountId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM accounts
            WHERE jsonb_array_length(recipients) = 0 AND NOT route_released
            ORDER BY id
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list empty accounts", e))?;

        stored_ids(ids)
    }

    async fn mark_route_released(&self, id: &AccountId) -> Result<(), DomainError> {
        sqlx::query("UPDATE accounts SET route_released = TRUE WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to mark route released", e))?;
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for PostgresAccountStore {
    async fn pending(&self, limit: u32) -> Result<Vec<PendingChange>, DomainError> {
        let rows: Vec<(i64, Value)> = sqlx::query_as(
            r#"
            SELECT sequence, payload FROM account_changes
            WHERE acknowledged_at IS NULL
            ORDER BY sequence
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to read change feed", e))?;

        Ok(rows
            .into_iter()
            .map(|(sequence, payload)| PendingChange { sequence, payload })
            .collect())
    }

    async fn acknowledge(&self, sequence: i64) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE account_changes SET acknowledged_at = NOW() WHERE sequence = $1 AND acknowledged_at IS NULL",
        )
        .bind(sequence)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to acknowledge change", e))?;
        Ok(())
    }
}
