use super::LoginAttemptStore;
use crate::errors::StoreError;
use crate::models::{LoginAttempt, NewLoginAttempt};
use sqlx::PgPool;

/// PostgreSQL audit sink for login attempts. Rows are never updated.
#[derive(Debug, Clone)]
pub struct PgLoginAttemptStore {
    pool: PgPool,
}

impl PgLoginAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LoginAttemptStore for PgLoginAttemptStore {
    async fn record(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt, StoreError> {
        sqlx::query_as::<_, LoginAttempt>(
            r#"
            INSERT INTO login_attempts (email, success, ip_address, attempted_at)
            VALUES ($1, $2, $3::inet, $4)
            RETURNING
                attempt_id, email, success, host(ip_address) as ip_address, attempted_at
            "#,
        )
        .bind(&attempt.email)
        .bind(attempt.success)
        .bind(attempt.ip_address.as_deref())
        .bind(attempt.attempted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to record login attempt: {}", e)))
    }

    async fn recent_for_email(
        &self,
        email: &str,
        limit: i64,
    ) -> Result<Vec<LoginAttempt>, StoreError> {
        sqlx::query_as::<_, LoginAttempt>(
            r#"
            SELECT attempt_id, email, success, host(ip_address) as ip_address, attempted_at
            FROM login_attempts
            WHERE email = $1
            ORDER BY attempted_at DESC
            LIMIT $2
            "#,
        )
        .bind(email)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch login attempts: {}", e)))
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn attempt(email: &str, success: bool, ip: Option<&str>, ago_secs: i64) -> NewLoginAttempt {
        NewLoginAttempt {
            email: email.to_string(),
            success,
            ip_address: ip.map(str::to_string),
            attempted_at: Utc::now() - Duration::seconds(ago_secs),
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_record_and_list(pool: PgPool) -> Result<(), StoreError> {
        let store = PgLoginAttemptStore::new(pool);

        let first = store
            .record(attempt("audit@example.com", false, Some("192.168.1.10"), 30))
            .await?;
        assert_eq!(first.ip_address.as_deref(), Some("192.168.1.10"));
        assert!(!first.success);

        store
            .record(attempt("audit@example.com", true, None, 10))
            .await?;
        store
            .record(attempt("other@example.com", true, Some("::1"), 5))
            .await?;

        let recent = store.recent_for_email("audit@example.com", 10).await?;
        assert_eq!(recent.len(), 2);
        assert!(recent[0].success, "newest first");
        assert!(recent[0].ip_address.is_none());

        let limited = store.recent_for_email("audit@example.com", 1).await?;
        assert_eq!(limited.len(), 1);

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_invalid_ip_rejected_by_database(pool: PgPool) -> Result<(), StoreError> {
        let store = PgLoginAttemptStore::new(pool);

        let result = store
            .record(attempt("bad-ip@example.com", true, Some("not-an-ip"), 0))
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));

        Ok(())
    }
}
