//! PostgreSQL-backed mail route store.
//!
//! Each rule is one row holding the allow-list and a version. A write with
//! `expected_version = 0` creates the row; any other write updates it only
//! while the version still matches.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{MailRouteStore, MailRule, RouteList, WriteOutcome};

pub struct PostgresMailRouteStore {
    pool: PgPool,
}

impl PostgresMailRouteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MailRouteStore for PostgresMailRouteStore {
    async fn fetch(&self, rule: &MailRule) -> Result<RouteList, DomainError> {
        let row: Option<(Json<Vec<String>>, i64)> = sqlx::query_as(
            "SELECT recipients, version FROM mail_routes WHERE rule_set = $1 AND name = $2",
        )
        .bind(&rule.rule_set)
        .bind(&rule.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch mail route", e))?;

        let Some((recipients, version)) = row else {
            return Ok(RouteList::default());
        };
        let version = u64::try_from(version).map_err(|_| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid route version: {}", version))
        })?;
        Ok(RouteList {
            recipients: recipients.0,
            version,
        })
    }

    async fn write(
        &self,
        rule: &MailRule,
        recipients: &[String],
        expected_version: u64,
    ) -> Result<WriteOutcome, DomainError> {
        let result = (if expected_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO mail_routes (rule_set, name, recipients, version)
                VALUES ($1, $2, $3, 1)
                ON CONFLICT (rule_set, name) DO NOTHING
                "#,
            )
            .bind(&rule.rule_set)
            .bind(&rule.name)
            .bind(Json(recipients))
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE mail_routes SET recipients = $3, version = version + 1
                WHERE rule_set = $1 AND name = $2 AND version = $4
                "#,
            )
            .bind(&rule.rule_set)
            .bind(&rule.name)
            .bind(Json(recipients))
            .bind(expected_version as i64)
            .execute(&self.pool)
            .await
        })
        .map_err(|e| DomainError::database("Failed to write mail route", e))?;

        Ok(if result.rows_affected() == 1 {
            WriteOutcome::Written
        } else {
            WriteOutcome::Conflict
        })
    }
}
