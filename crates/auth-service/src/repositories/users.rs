//! PostgreSQL credential store.
//!
//! Users live in `auth_users`; role assignments are rows in
//! `auth_user_roles` pointing at the `auth_roles` reference table.

use super::CredentialStore;
use crate::errors::StoreError;
use crate::models::User;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM auth_users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    StoreError::Database(format!("Failed to check email existence: {}", e))
                })?;

        Ok(exists)
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        default_role: &str,
    ) -> Result<User, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to start transaction: {}", e)))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO auth_users (email, password_hash)
            VALUES ($1, $2)
            RETURNING
                user_id, email, password_hash, is_email_verified, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::Database(format!("Failed to create user: {}", e))
            }
        })?;

        let linked = sqlx::query(
            r#"
            INSERT INTO auth_user_roles (user_id, role_id)
            SELECT $1, role_id FROM auth_roles WHERE name = $2
            "#,
        )
        .bind(user.user_id)
        .bind(default_role)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to assign role: {}", e)))?;

        if linked.rows_affected() != 1 {
            return Err(StoreError::Database(format!(
                "Role {} is not defined",
                default_role
            )));
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to commit user: {}", e)))?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, is_email_verified, created_at, updated_at
            FROM auth_users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch user by email: {}", e)))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, is_email_verified, created_at, updated_at
            FROM auth_users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch user by id: {}", e)))
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let roles: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.name
            FROM auth_user_roles ur
            JOIN auth_roles r ON r.role_id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch user roles: {}", e)))?;

        Ok(roles.into_iter().map(|(name,)| name).collect())
    }
}
