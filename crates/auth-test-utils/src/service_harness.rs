//! In-process service harness
//!
//! Builds a full `AuthService` over the in-memory stores and keeps handles to
//! those stores so tests can inspect rows and inject outages.

use crate::crypto_fixtures::{test_token_config, test_token_service};
use auth_service::config::MIN_BCRYPT_COST;
use auth_service::crypto::PasswordHasher;
use auth_service::repositories::memory::{
    InMemoryCredentialStore, InMemoryLoginAttemptStore, InMemoryRefreshTokenStore,
};
use auth_service::services::token_service::TokenConfig;
use auth_service::services::{AuthService, Stores};
use std::sync::Arc;

/// A ready-to-use `AuthService` plus its backing stores.
///
/// # Example
/// ```rust,ignore
/// let harness = TestAuthService::new();
/// harness.login_attempts.set_unavailable(true);
/// assert!(harness.service.login(TEST_EMAIL_ALICE, TEST_PASSWORD, None).await.is_err());
/// ```
#[derive(Clone)]
pub struct TestAuthService {
    pub service: AuthService,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    pub login_attempts: Arc<InMemoryLoginAttemptStore>,
}

impl Default for TestAuthService {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAuthService {
    /// Harness with default token lifetimes and the cheapest accepted
    /// bcrypt cost.
    pub fn new() -> Self {
        Self::with_token_config(test_token_config())
    }

    pub fn with_token_config(config: TokenConfig) -> Self {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
        let login_attempts = Arc::new(InMemoryLoginAttemptStore::new());

        let stores = Stores {
            credentials: credentials.clone(),
            refresh_tokens: refresh_tokens.clone(),
            login_attempts: login_attempts.clone(),
        };
        let hasher = PasswordHasher::new(MIN_BCRYPT_COST).expect("minimum cost is valid");
        let service = AuthService::new(test_token_service(config), hasher, stores)
            .expect("harness service builds");

        Self {
            service,
            credentials,
            refresh_tokens,
            login_attempts,
        }
    }
}
