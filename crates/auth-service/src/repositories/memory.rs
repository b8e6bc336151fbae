//! In-memory implementations of the storage traits.
//!
//! Used by the test suites and for running the service without a database.
//! Each store guards its state with a single async mutex, so a read-check-write
//! sequence inside one call is atomic exactly like the PostgreSQL transaction
//! it stands in for.
//!
//! Every store can be switched into an unavailable mode with
//! `set_unavailable(true)`, after which all calls fail with
//! `StoreError::Database`. Fault injection tests use this to exercise error
//! paths.

use super::{CredentialStore, LoginAttemptStore, RefreshTokenStore};
use crate::errors::StoreError;
use crate::models::{
    LoginAttempt, NewLoginAttempt, NewRefreshToken, RefreshTokenRecord, Role, User,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Roles seeded by the schema migration.
const SEEDED_ROLES: [&str; 2] = ["ADMIN", "USER"];

fn check_available(unavailable: &AtomicBool) -> Result<(), StoreError> {
    if unavailable.load(Ordering::SeqCst) {
        return Err(StoreError::Database("store unavailable".to_string()));
    }
    Ok(())
}

// =============================================================================
// Credentials
// =============================================================================

#[derive(Default)]
struct CredentialState {
    users: HashMap<Uuid, User>,
    roles: Vec<Role>,
    /// (user_id, role_id)
    user_roles: Vec<(Uuid, Uuid)>,
}

pub struct InMemoryCredentialStore {
    state: Mutex<CredentialState>,
    unavailable: AtomicBool,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        let roles = SEEDED_ROLES
            .iter()
            .map(|name| Role {
                role_id: Uuid::new_v4(),
                name: (*name).to_string(),
            })
            .collect();

        Self {
            state: Mutex::new(CredentialState {
                roles,
                ..CredentialState::default()
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        check_available(&self.unavailable)?;
        let state = self.state.lock().await;
        Ok(state.users.values().any(|u| u.email == email))
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        default_role: &str,
    ) -> Result<User, StoreError> {
        check_available(&self.unavailable)?;
        let mut state = self.state.lock().await;

        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict);
        }

        let role_id = state
            .roles
            .iter()
            .find(|r| r.name == default_role)
            .map(|r| r.role_id)
            .ok_or_else(|| StoreError::Database(format!("Role {} is not defined", default_role)))?;

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        };

        state.users.insert(user.user_id, user.clone());
        state.user_roles.push((user.user_id, role_id));

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        check_available(&self.unavailable)?;
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        check_available(&self.unavailable)?;
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        check_available(&self.unavailable)?;
        let state = self.state.lock().await;

        let mut names: Vec<String> = state
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, role_id)| state.roles.iter().find(|r| r.role_id == *role_id))
            .map(|r| r.name.clone())
            .collect();
        names.sort();

        Ok(names)
    }
}

// =============================================================================
// Refresh tokens
// =============================================================================

pub struct InMemoryRefreshTokenStore {
    records: Mutex<Vec<RefreshTokenRecord>>,
    unavailable: AtomicBool,
}

impl Default for InMemoryRefreshTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert a fully specified record, bypassing the ledger. Test setup only.
    pub async fn insert_raw(&self, record: RefreshTokenRecord) {
        self.records.lock().await.push(record);
    }
}

fn push_record(
    records: &mut Vec<RefreshTokenRecord>,
    token: NewRefreshToken,
) -> Result<RefreshTokenRecord, StoreError> {
    if records.iter().any(|r| r.token_hash == token.token_hash) {
        return Err(StoreError::Conflict);
    }

    let record = RefreshTokenRecord {
        token_id: Uuid::new_v4(),
        user_id: token.user_id,
        token_hash: token.token_hash,
        revoked: false,
        created_at: Utc::now(),
        expires_at: token.expires_at,
    };
    records.push(record.clone());

    Ok(record)
}

#[async_trait::async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError> {
        check_available(&self.unavailable)?;
        let mut records = self.records.lock().await;
        push_record(&mut records, token)
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        check_available(&self.unavailable)?;
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.token_hash == token_hash).cloned())
    }

    async fn rotate(
        &self,
        old_token_id: Uuid,
        replacement: NewRefreshToken,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        check_available(&self.unavailable)?;
        let mut records = self.records.lock().await;

        if records
            .iter()
            .any(|r| r.token_hash == replacement.token_hash)
        {
            return Err(StoreError::Conflict);
        }

        match records
            .iter_mut()
            .find(|r| r.token_id == old_token_id && !r.revoked)
        {
            Some(old) => old.revoked = true,
            None => return Ok(None),
        }

        push_record(&mut records, replacement).map(Some)
    }

    async fn revoke(&self, token_id: Uuid) -> Result<bool, StoreError> {
        check_available(&self.unavailable)?;
        let mut records = self.records.lock().await;

        match records
            .iter_mut()
            .find(|r| r.token_id == token_id && !r.revoked)
        {
            Some(record) => {
                record.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        check_available(&self.unavailable)?;
        let mut records = self.records.lock().await;

        let mut flipped = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.user_id == user_id && !r.revoked)
        {
            record.revoked = true;
            flipped += 1;
        }

        Ok(flipped)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        check_available(&self.unavailable)?;
        let records = self.records.lock().await;

        let mut owned: Vec<RefreshTokenRecord> = records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned)
    }
}

// =============================================================================
// Login attempts
// =============================================================================

pub struct InMemoryLoginAttemptStore {
    attempts: Mutex<Vec<LoginAttempt>>,
    unavailable: AtomicBool,
}

impl Default for InMemoryLoginAttemptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLoginAttemptStore {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every recorded attempt in insertion order.
    pub async fn all(&self) -> Vec<LoginAttempt> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl LoginAttemptStore for InMemoryLoginAttemptStore {
    async fn record(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt, StoreError> {
        check_available(&self.unavailable)?;

        let row = LoginAttempt {
            attempt_id: Uuid::new_v4(),
            email: attempt.email,
            success: attempt.success,
            ip_address: attempt.ip_address,
            attempted_at: attempt.attempted_at,
        };
        self.attempts.lock().await.push(row.clone());

        Ok(row)
    }

    async fn recent_for_email(
        &self,
        email: &str,
        limit: i64,
    ) -> Result<Vec<LoginAttempt>, StoreError> {
        check_available(&self.unavailable)?;
        let attempts = self.attempts.lock().await;

        let mut matching: Vec<LoginAttempt> = attempts
            .iter()
            .filter(|a| a.email == email)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));
        matching.truncate(usize::try_from(limit.max(0)).unwrap_or(0));

        Ok(matching)
    }
}
