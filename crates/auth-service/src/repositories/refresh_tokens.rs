//! PostgreSQL refresh token ledger storage.
//!
//! Rotation is a conditional update inside a transaction: the old record is
//! flipped with `WHERE revoked = false`, and the replacement is inserted only
//! if that update touched exactly one row. The row lock taken by the update
//! serializes concurrent rotations of the same record.

use super::users::is_unique_violation;
use super::RefreshTokenStore;
use crate::errors::StoreError;
use crate::models::{NewRefreshToken, RefreshTokenRecord};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_record(
    tx: &mut Transaction<'_, Postgres>,
    token: &NewRefreshToken,
) -> Result<RefreshTokenRecord, StoreError> {
    sqlx::query_as::<_, RefreshTokenRecord>(
        r#"
        INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        RETURNING token_id, user_id, token_hash, revoked, created_at, expires_at
        "#,
    )
    .bind(token.user_id)
    .bind(&token.token_hash)
    .bind(token.expires_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict
        } else {
            StoreError::Database(format!("Failed to insert refresh token: {}", e))
        }
    })
}

#[async_trait::async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to start transaction: {}", e)))?;

        let record = insert_record(&mut tx, &token).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to commit refresh token: {}", e)))?;

        Ok(record)
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT token_id, user_id, token_hash, revoked, created_at, expires_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch refresh token: {}", e)))
    }

    async fn rotate(
        &self,
        old_token_id: Uuid,
        replacement: NewRefreshToken,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to start transaction: {}", e)))?;

        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true
            WHERE token_id = $1 AND revoked = false
            "#,
        )
        .bind(old_token_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to revoke refresh token: {}", e)))?;

        if revoked.rows_affected() != 1 {
            // Lost the race or already consumed; dropping tx rolls back
            return Ok(None);
        }

        let record = insert_record(&mut tx, &replacement).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to commit rotation: {}", e)))?;

        Ok(Some(record))
    }

    async fn revoke(&self, token_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true
            WHERE token_id = $1 AND revoked = false
            "#,
        )
        .bind(token_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to revoke refresh token: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true
            WHERE user_id = $1 AND revoked = false
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to revoke user sessions: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT token_id, user_id, token_hash, revoked, created_at, expires_at
            FROM refresh_tokens
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to list refresh tokens: {}", e)))
    }
}
