//! Registration and authentication use cases.
//!
//! Composes the credential store, password hasher, token service, refresh
//! token ledger and login attempt recorder. Input is validated here, before
//! any persistence call.

use crate::crypto::PasswordHasher;
use crate::errors::{
    CryptoError, IssueError, LoginError, RefreshError, RegisterError, RevokeError, TokenError,
};
use crate::models::{RegisterResponse, RevokedSessions, TokenPair, User, DEFAULT_ROLE};
use crate::observability::metrics::record_operation;
use crate::observability::{hash_for_correlation, ErrorCategory};
use crate::repositories::{CredentialStore, LoginAttemptStore, RefreshTokenStore};
use crate::services::login_attempt_recorder::LoginAttemptRecorder;
use crate::services::refresh_token_ledger::RefreshTokenLedger;
use crate::services::token_service::{access_claims, TokenService};
use crate::services::validation::{is_valid_email, normalize_email, password_violation};
use chrono::Utc;
use common::jwt::TokenUse;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Verified against when the user does not exist, so unknown-email and
/// wrong-password logins cost one bcrypt verification each.
const DUMMY_PASSWORD: &str = "timing-equalization-placeholder";

/// Storage collaborators the orchestrator is built over.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub login_attempts: Arc<dyn LoginAttemptStore>,
}

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
    ledger: RefreshTokenLedger,
    attempts: LoginAttemptRecorder,
    dummy_hash: String,
}

fn record_outcome<T, E>(operation: &str, start: Instant, result: &Result<T, E>)
where
    for<'a> ErrorCategory: From<&'a E>,
{
    let status = match result {
        Ok(_) => "success",
        Err(e) => ErrorCategory::from(e).as_str(),
    };
    record_operation(operation, status, start.elapsed());
}

impl AuthService {
    /// Fails only if the dummy verification hash cannot be computed.
    pub fn new(
        tokens: TokenService,
        hasher: PasswordHasher,
        stores: Stores,
    ) -> Result<Self, CryptoError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        let ledger = RefreshTokenLedger::new(
            tokens.clone(),
            stores.refresh_tokens,
            Arc::clone(&stores.credentials),
        );

        Ok(Self {
            credentials: stores.credentials,
            hasher,
            tokens,
            ledger,
            attempts: LoginAttemptRecorder::new(stores.login_attempts),
            dummy_hash,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn ledger(&self) -> &RefreshTokenLedger {
        &self.ledger
    }

    /// Create an account with the default role and log it in.
    #[instrument(skip_all, fields(email_hash = tracing::field::Empty))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, RegisterError> {
        let start = Instant::now();
        let result = self.register_inner(email, password).await;
        record_outcome("register", start, &result);
        result
    }

    async fn register_inner(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, RegisterError> {
        let email = normalize_email(email);
        tracing::Span::current().record("email_hash", hash_for_correlation(&email).as_str());

        if !is_valid_email(&email) {
            return Err(RegisterError::InvalidInput(
                "Invalid email format".to_string(),
            ));
        }
        if let Some(reason) = password_violation(password) {
            return Err(RegisterError::InvalidInput(reason.to_string()));
        }

        if self.credentials.email_exists(&email).await? {
            tracing::info!(target: "auth.service", "Registration rejected: email already registered");
            return Err(RegisterError::Conflict);
        }

        let password_hash = self.hasher.hash(password)?;

        // A concurrent registration can still win between the check and the
        // insert; the unique constraint reports it as Conflict.
        let user = self
            .credentials
            .create_user(&email, &password_hash, DEFAULT_ROLE)
            .await?;

        let tokens = self
            .issue_pair(&user, &[DEFAULT_ROLE.to_string()])
            .await?;

        tracing::info!(
            target: "auth.service",
            user = %hash_for_correlation(&user.user_id.to_string()),
            "User registered"
        );

        Ok(RegisterResponse {
            user_id: user.user_id,
            tokens,
        })
    }

    /// Authenticate by email and password.
    ///
    /// Every attempt is recorded, whatever its outcome. An unknown email and
    /// a wrong password both yield `Unauthorized`.
    #[instrument(skip_all, fields(email_hash = tracing::field::Empty))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip_address: Option<&str>,
    ) -> Result<TokenPair, LoginError> {
        let start = Instant::now();
        let result = self.login_inner(email, password, ip_address).await;
        record_outcome("login", start, &result);
        result
    }

    async fn login_inner(
        &self,
        email: &str,
        password: &str,
        ip_address: Option<&str>,
    ) -> Result<TokenPair, LoginError> {
        let email = normalize_email(email);
        tracing::Span::current().record("email_hash", hash_for_correlation(&email).as_str());

        let user = if is_valid_email(&email) {
            self.credentials.find_by_email(&email).await?
        } else {
            None
        };

        let authenticated = match &user {
            Some(user) => self.hasher.verify(password, &user.password_hash),
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                false
            }
        };

        self.attempts
            .record(&email, authenticated, ip_address, Utc::now())
            .await;

        let user = match user {
            Some(user) if authenticated => user,
            _ => {
                tracing::info!(target: "auth.service", "Login rejected: invalid credentials");
                return Err(LoginError::Unauthorized);
            }
        };

        let roles = self.credentials.roles_for_user(user.user_id).await?;
        let tokens = self.issue_pair(&user, &roles).await?;

        tracing::info!(
            target: "auth.service",
            user = %hash_for_correlation(&user.user_id.to_string()),
            "User logged in"
        );

        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair, consuming it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let start = Instant::now();
        let result = self.ledger.validate_and_rotate(refresh_token).await;
        record_outcome("refresh", start, &result);
        result
    }

    /// Log out the session behind `refresh_token`.
    pub async fn revoke_session(&self, refresh_token: &str) -> Result<bool, RevokeError> {
        self.ledger.revoke_session(refresh_token).await
    }

    /// Revoke every session of `user_id`.
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> Result<RevokedSessions, RevokeError> {
        let revoked = self.ledger.revoke_all(user_id).await?;
        Ok(RevokedSessions { revoked })
    }

    /// Subject of a valid access token.
    pub fn authenticate_access_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = self.tokens.verify_for_use(token, TokenUse::Access)?;
        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Invalid)
    }

    async fn issue_pair(&self, user: &User, roles: &[String]) -> Result<TokenPair, IssueError> {
        let refresh = self.ledger.issue(user.user_id).await?;
        let access = self
            .tokens
            .issue_access_token(user.user_id, access_claims(&user.email, roles))?;

        Ok(TokenPair::bearer(
            access.token,
            refresh.token,
            self.tokens.config().access_ttl.num_seconds(),
        ))
    }
}
