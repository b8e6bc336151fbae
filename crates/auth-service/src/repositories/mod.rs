//! Storage collaborators.
//!
//! Each store is a trait so the services can run against PostgreSQL in
//! production and against [`memory`] in tests and local tooling. The
//! PostgreSQL implementations live next to their tables.

pub mod login_attempts;
pub mod memory;
pub mod refresh_tokens;
pub mod users;

use crate::errors::StoreError;
use crate::models::{LoginAttempt, NewLoginAttempt, NewRefreshToken, RefreshTokenRecord, User};
use uuid::Uuid;

pub use login_attempts::PgLoginAttemptStore;
pub use refresh_tokens::PgRefreshTokenStore;
pub use users::PgCredentialStore;

/// Users, password hashes and role assignments.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Persist a user and link it to `default_role` atomically.
    ///
    /// A duplicate email is reported as `StoreError::Conflict`.
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        default_role: &str,
    ) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Role names assigned to a user, sorted.
    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>, StoreError>;
}

/// Refresh token records, keyed by token digest.
#[async_trait::async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError>;

    async fn find_by_hash(&self, token_hash: &str)
        -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Revoke `old_token_id` and persist `replacement` as one atomic step.
    ///
    /// Returns `None`, without inserting anything, when the old record was
    /// already revoked. Of two concurrent calls for the same record exactly
    /// one gets `Some`.
    async fn rotate(
        &self,
        old_token_id: Uuid,
        replacement: NewRefreshToken,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Revoke one record. Returns whether this call flipped it.
    async fn revoke(&self, token_id: Uuid) -> Result<bool, StoreError>;

    /// Revoke every unrevoked record of a user. Returns how many were flipped.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// All records for a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, StoreError>;
}

/// Append-only audit sink for authentication attempts.
#[async_trait::async_trait]
pub trait LoginAttemptStore: Send + Sync {
    async fn record(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt, StoreError>;

    /// Most recent attempts for an email, newest first.
    async fn recent_for_email(
        &self,
        email: &str,
        limit: i64,
    ) -> Result<Vec<LoginAttempt>, StoreError>;
}
