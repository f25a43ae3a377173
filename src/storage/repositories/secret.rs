//! PostgreSQL secret store.
//!
//! Transitions lock the row with `SELECT ... FOR UPDATE` inside a
//! transaction, so two consumers of the same id are serialized by the
//! database and exactly one of them observes the `from` state.

use crate::domain::{Secret, SecretContent, SecretId, SecretState};
use crate::errors::{BurnnoteError, Result};
use crate::storage::store::{DurableStore, TransitionEffect};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{instrument, Instrument};

/// Database row for secrets.
#[derive(Debug, Clone, FromRow)]
struct SecretRow {
    pub id: String,
    pub content: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<SecretRow> for Secret {
    type Error = BurnnoteError;

    fn try_from(row: SecretRow) -> Result<Self> {
        let state = SecretState::from_str(&row.state).map_err(|e| {
            BurnnoteError::internal(format!("Invalid secret state '{}': {}", row.state, e))
        })?;

        Ok(Secret {
            id: SecretId::from_string(row.id),
            content: SecretContent::new(row.content),
            created_at: row.created_at,
            expires_at: row.expires_at,
            state,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgSecretStore {
    pool: DbPool,
}

impl PgSecretStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl DurableStore for PgSecretStore {
    #[instrument(skip(self, secret), fields(secret_id = %secret.id), name = "db_insert_secret")]
    async fn insert(&self, secret: &Secret) -> Result<()> {
        sqlx::query(
            "INSERT INTO secrets (id, content, state, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(secret.id.as_str())
        .bind(secret.content.expose())
        .bind(secret.state.as_str())
        .bind(secret.created_at)
        .bind(secret.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to insert secret");
            BurnnoteError::database(e, format!("Failed to insert secret '{}'", secret.id))
        })?;

        Ok(())
    }

    #[instrument(
        skip(self),
        fields(secret_id = %id, from = %from, to = %to),
        name = "db_try_transition"
    )]
    async fn try_transition(
        &self,
        id: &SecretId,
        from: SecretState,
        to: SecretState,
        now: DateTime<Utc>,
    ) -> Result<Option<Secret>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BurnnoteError::database(e, "Failed to begin transition transaction"))?;

        let row = sqlx::query_as::<_, SecretRow>(
            "SELECT id, content, state, created_at, expires_at FROM secrets WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .instrument(crate::db_span!("lock_secret", secret_id = %id))
        .await
        .map_err(|e| BurnnoteError::database(e, format!("Failed to lock secret '{}'", id)))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let secret = Secret::try_from(row)?;

        if secret.state != from {
            return Ok(None);
        }

        if secret.is_expired(now) {
            sqlx::query("DELETE FROM secrets WHERE id = $1")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    BurnnoteError::database(e, format!("Failed to delete expired secret '{}'", id))
                })?;
            tx.commit()
                .await
                .map_err(|e| BurnnoteError::database(e, "Failed to commit expiry deletion"))?;

            tracing::debug!("Expired secret removed during transition");
            return Ok(None);
        }

        let statement = match TransitionEffect::of(from, to) {
            TransitionEffect::Delete => {
                Some(sqlx::query("DELETE FROM secrets WHERE id = $1").bind(id.as_str()))
            }
            TransitionEffect::UpdateState => Some(
                sqlx::query("UPDATE secrets SET state = $2, delivered_at = $3 WHERE id = $1")
                    .bind(id.as_str())
                    .bind(to.as_str())
                    .bind(now),
            ),
            TransitionEffect::ClearContent => Some(
                sqlx::query("UPDATE secrets SET state = $2, content = '' WHERE id = $1")
                    .bind(id.as_str())
                    .bind(to.as_str()),
            ),
            TransitionEffect::Unchanged => None,
        };

        if let Some(statement) = statement {
            statement.execute(&mut *tx).await.map_err(|e| {
                BurnnoteError::database(e, format!("Failed to transition secret '{}'", id))
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| BurnnoteError::database(e, "Failed to commit secret transition"))?;

        Ok(Some(secret))
    }

    #[instrument(skip(self), name = "db_delete_expired_before")]
    async fn delete_expired_before(&self, before: DateTime<Utc>, limit: u32) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM secrets WHERE id IN ( \
                SELECT id FROM secrets \
                WHERE expires_at IS NOT NULL AND expires_at <= $1 \
                ORDER BY expires_at \
                LIMIT $2 \
                FOR UPDATE SKIP LOCKED \
             )",
        )
        .bind(before)
        .bind(i64::from(limit))
        .execute(&self.pool)
        .instrument(crate::db_span!("sweep_expired", limit = limit))
        .await
        .map_err(|e| BurnnoteError::database(e, "Failed to delete expired secrets"))?;

        Ok(result.rows_affected())
    }
}
