//! Refresh token ledger.
//!
//! The ledger is the authority on refresh token validity. A refresh token is
//! honored only if its signature verifies AND its digest matches a record
//! that is neither revoked nor expired. Every successful refresh consumes the
//! presented token and issues a replacement; presenting a consumed token
//! again revokes every session of its owner.

use crate::crypto::hash_refresh_token;
use crate::errors::{IssueError, RefreshError, RevokeError, StoreError};
use crate::models::{NewRefreshToken, TokenPair};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{
    record_refresh_reuse_detected, record_refresh_rotation, record_sessions_revoked,
};
use crate::repositories::{CredentialStore, RefreshTokenStore};
use crate::services::token_service::{access_claims, TokenService};
use chrono::{DateTime, Utc};
use common::jwt::TokenUse;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// A freshly persisted refresh token.
#[derive(Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub record_id: Uuid,
}

impl std::fmt::Debug for IssuedRefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedRefreshToken")
            .field("token", &"[REDACTED]")
            .field("record_id", &self.record_id)
            .finish()
    }
}

#[derive(Clone)]
pub struct RefreshTokenLedger {
    tokens: TokenService,
    records: Arc<dyn RefreshTokenStore>,
    credentials: Arc<dyn CredentialStore>,
}

fn outcome_label(err: &RefreshError) -> &'static str {
    match err {
        RefreshError::Invalid => "invalid",
        RefreshError::Expired => "expired",
        RefreshError::Revoked => "revoked",
        RefreshError::NotFound => "not_found",
        RefreshError::Internal => "internal",
    }
}

fn expiry_of(exp: i64) -> Result<DateTime<Utc>, IssueError> {
    DateTime::<Utc>::from_timestamp(exp, 0).ok_or_else(|| {
        IssueError::Store(StoreError::Database(format!(
            "refresh token expiry {} out of range",
            exp
        )))
    })
}

impl RefreshTokenLedger {
    pub fn new(
        tokens: TokenService,
        records: Arc<dyn RefreshTokenStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            tokens,
            records,
            credentials,
        }
    }

    /// Mint a refresh token for `user_id` and persist its digest.
    #[instrument(skip_all)]
    pub async fn issue(&self, user_id: Uuid) -> Result<IssuedRefreshToken, IssueError> {
        let issued = self.tokens.issue_refresh_token(user_id)?;

        let record = self
            .records
            .insert(NewRefreshToken {
                user_id,
                token_hash: hash_refresh_token(&issued.token),
                expires_at: expiry_of(issued.claims.exp)?,
            })
            .await?;

        Ok(IssuedRefreshToken {
            token: issued.token,
            record_id: record.token_id,
        })
    }

    /// Consume `presented` and return a fresh access/refresh pair.
    ///
    /// Fails with `Revoked` when the token was already consumed or revoked,
    /// after revoking every other session of the same user.
    #[instrument(skip_all, fields(user = tracing::field::Empty, outcome = tracing::field::Empty))]
    pub async fn validate_and_rotate(&self, presented: &str) -> Result<TokenPair, RefreshError> {
        let result = self.rotate_inner(presented).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => outcome_label(e),
        };
        tracing::Span::current().record("outcome", outcome);
        record_refresh_rotation(outcome);

        result
    }

    async fn rotate_inner(&self, presented: &str) -> Result<TokenPair, RefreshError> {
        let claims = self.tokens.verify_for_use(presented, TokenUse::Refresh)?;

        let record = self
            .records
            .find_by_hash(&hash_refresh_token(presented))
            .await?
            .ok_or(RefreshError::NotFound)?;

        tracing::Span::current().record(
            "user",
            hash_for_correlation(&record.user_id.to_string()).as_str(),
        );

        if record.user_id.to_string() != claims.sub {
            tracing::warn!(target: "auth.ledger", "Refresh token subject does not match ledger owner");
            return Err(RefreshError::Invalid);
        }

        if record.revoked {
            self.handle_reuse(record.user_id).await;
            return Err(RefreshError::Revoked);
        }

        if record.is_expired_at(Utc::now()) {
            return Err(RefreshError::Expired);
        }

        let user = self
            .credentials
            .find_by_id(record.user_id)
            .await?
            .ok_or(RefreshError::Invalid)?;
        let roles = self.credentials.roles_for_user(user.user_id).await?;

        let replacement = self.tokens.issue_refresh_token(user.user_id)?;
        let rotated = self
            .records
            .rotate(
                record.token_id,
                NewRefreshToken {
                    user_id: user.user_id,
                    token_hash: hash_refresh_token(&replacement.token),
                    expires_at: expiry_of(replacement.claims.exp)?,
                },
            )
            .await?;

        if rotated.is_none() {
            // Another request consumed this token between lookup and rotation
            self.handle_reuse(record.user_id).await;
            return Err(RefreshError::Revoked);
        }

        let access = self
            .tokens
            .issue_access_token(user.user_id, access_claims(&user.email, &roles))?;

        Ok(TokenPair::bearer(
            access.token,
            replacement.token,
            self.tokens.config().access_ttl.num_seconds(),
        ))
    }

    /// Revoke every session of a user whose consumed token was replayed.
    async fn handle_reuse(&self, user_id: Uuid) {
        record_refresh_reuse_detected();

        match self.records.revoke_all_for_user(user_id).await {
            Ok(count) => {
                record_sessions_revoked("reuse_detected", count);
                tracing::warn!(
                    target: "auth.ledger",
                    user = %hash_for_correlation(&user_id.to_string()),
                    revoked = count,
                    "Refresh token reuse detected, all sessions revoked"
                );
            }
            Err(e) => {
                tracing::error!(
                    target: "auth.ledger",
                    user = %hash_for_correlation(&user_id.to_string()),
                    error = %e,
                    "Refresh token reuse detected but session revocation failed"
                );
            }
        }
    }

    /// Log out the session that owns `presented`.
    ///
    /// Returns whether this call revoked the record. Unknown or already
    /// revoked tokens are not an error.
    #[instrument(skip_all)]
    pub async fn revoke_session(&self, presented: &str) -> Result<bool, RevokeError> {
        let claims = self.tokens.verify_for_use(presented, TokenUse::Refresh)?;

        let Some(record) = self
            .records
            .find_by_hash(&hash_refresh_token(presented))
            .await?
        else {
            return Ok(false);
        };

        if record.user_id.to_string() != claims.sub {
            return Err(RevokeError::Invalid);
        }

        let revoked = self.records.revoke(record.token_id).await?;
        if revoked {
            record_sessions_revoked("logout", 1);
        }

        Ok(revoked)
    }

    /// Revoke every active session of `user_id`. Idempotent.
    #[instrument(skip_all)]
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, RevokeError> {
        let count = self.records.revoke_all_for_user(user_id).await?;
        record_sessions_revoked("revoke_all", count);

        tracing::info!(
            target: "auth.ledger",
            user = %hash_for_correlation(&user_id.to_string()),
            revoked = count,
            "Revoked all sessions"
        );

        Ok(count)
    }

    /// Number of unrevoked, unexpired sessions of `user_id`.
    pub async fn active_sessions(&self, user_id: Uuid) -> Result<usize, StoreError> {
        let now = Utc::now();
        let records = self.records.list_for_user(user_id).await?;
        Ok(records.iter().filter(|r| r.is_active_at(now)).count())
    }
}
