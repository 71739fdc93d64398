//! PostgreSQL-backed attempt store using the `failed_login_attempts`
//! table.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE failed_login_attempts (
//!     id          BIGSERIAL PRIMARY KEY,
//!     principal   TEXT NOT NULL,
//!     source      TEXT NOT NULL,
//!     occurred_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE INDEX failed_login_attempts_principal_occurred_at_idx
//!     ON failed_login_attempts (principal, occurred_at);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use gatewarden_application::AttemptStore;
use gatewarden_core::{AttemptSource, PrincipalId, StoreError, StoreResult};

/// PostgreSQL implementation of the attempt-store port.
#[derive(Clone)]
pub struct PostgresAttemptStore {
    pool: PgPool,
}

impl PostgresAttemptStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_error(context: &str, error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(format!("{context}: {error}")),
        sqlx::Error::Database(database) if database.constraint().is_some() => {
            StoreError::Constraint(format!("{context}: {error}"))
        }
        _ => StoreError::Connection(format!("{context}: {error}")),
    }
}

#[async_trait]
impl AttemptStore for PostgresAttemptStore {
    async fn record(&self, principal: &PrincipalId, source: &AttemptSource) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO failed_login_attempts (principal, source, occurred_at)
            VALUES ($1, $2, now())
            "#,
        )
        .bind(principal.as_str())
        .bind(source.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to record login attempt", error))?;

        Ok(())
    }

    async fn count_since(
        &self,
        principal: &PrincipalId,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*)
            FROM failed_login_attempts
            WHERE principal = $1 AND occurred_at > $2
            "#,
        )
        .bind(principal.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to count recent login attempts", error))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn most_recent(&self, principal: &PrincipalId) -> StoreResult<Option<DateTime<Utc>>> {
        let most_recent: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT max(occurred_at)
            FROM failed_login_attempts
            WHERE principal = $1
            "#,
        )
        .bind(principal.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to look up latest login attempt", error))?;

        Ok(most_recent)
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM failed_login_attempts
            WHERE occurred_at < $1
            "#,
        )
        .bind(older_than)
        .execute(&self.pool)
        .await
        .map_err(|error| map_sqlx_error("failed to prune stale login attempts", error))?;

        Ok(result.rows_affected())
    }

    async fn clear(&self) -> StoreResult<u64> {
        let result = sqlx::query(r#"DELETE FROM failed_login_attempts"#)
            .execute(&self.pool)
            .await
            .map_err(|error| map_sqlx_error("failed to clear login attempt history", error))?;

        Ok(result.rows_affected())
    }
}
