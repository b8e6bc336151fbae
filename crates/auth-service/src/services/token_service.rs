//! Signed access and refresh token issuance and verification.

use crate::config::Config;
use crate::crypto::{self, Claims, KeyMaterial, RESERVED_CLAIMS};
use crate::errors::{CryptoError, TokenError};
use crate::observability::metrics::record_token_issuance;
use common::jwt::TokenUse;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Issuer and lifetimes for minted tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub issuer: String,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
    pub clock_skew: Duration,
}

impl From<&Config> for TokenConfig {
    fn from(config: &Config) -> Self {
        Self {
            issuer: config.jwt_issuer.clone(),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            clock_skew: config.jwt_clock_skew,
        }
    }
}

/// Claims embedded in every access token.
pub fn access_claims(email: &str, roles: &[String]) -> serde_json::Map<String, serde_json::Value> {
    let mut claims = serde_json::Map::new();
    claims.insert("email".to_string(), serde_json::json!(email));
    claims.insert("roles".to_string(), serde_json::json!(roles));
    claims
}

/// A minted token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Clone)]
pub struct TokenService {
    keys: Arc<KeyMaterial>,
    config: TokenConfig,
}

impl TokenService {
    pub fn new(keys: Arc<KeyMaterial>, config: TokenConfig) -> Self {
        Self { keys, config }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mint an access token for `subject` carrying `extra` claims.
    ///
    /// Extra claims that collide with a registered claim name are dropped.
    #[instrument(skip_all)]
    pub fn issue_access_token(
        &self,
        subject: Uuid,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<IssuedToken, CryptoError> {
        let extra = extra
            .into_iter()
            .filter(|(name, _)| {
                let reserved = RESERVED_CLAIMS.contains(&name.as_str());
                if reserved {
                    tracing::debug!(target: "auth.token", claim = %name, "Dropping reserved claim");
                }
                !reserved
            })
            .collect();

        self.issue(subject, TokenUse::Access, self.config.access_ttl, extra)
    }

    /// Mint a refresh token for `subject`. Carries no extra claims.
    #[instrument(skip_all)]
    pub fn issue_refresh_token(&self, subject: Uuid) -> Result<IssuedToken, CryptoError> {
        self.issue(
            subject,
            TokenUse::Refresh,
            self.config.refresh_ttl,
            serde_json::Map::new(),
        )
    }

    fn issue(
        &self,
        subject: Uuid,
        token_use: TokenUse,
        ttl: chrono::Duration,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<IssuedToken, CryptoError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: self.config.issuer.clone(),
            sub: subject.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
            jti: Uuid::new_v4().to_string(),
            token_use,
            extra,
        };

        match crypto::sign_jwt(&claims, &self.keys) {
            Ok(token) => {
                record_token_issuance(token_use.as_str(), "success");
                Ok(IssuedToken { token, claims })
            }
            Err(e) => {
                record_token_issuance(token_use.as_str(), "error");
                Err(e)
            }
        }
    }

    /// Verify signature, issuer, expiry and `iat`, then return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        crypto::verify_jwt(token, &self.keys, &self.config.issuer, self.config.clock_skew)
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.verify(token).is_ok()
    }

    pub fn extract_claims(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token)
    }

    /// Verified subject of the token.
    pub fn extract_subject(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = self.verify(token)?;
        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Invalid)
    }

    /// Verify and additionally require the given `token_use`.
    pub fn verify_for_use(&self, token: &str, expected: TokenUse) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.token_use != expected {
            tracing::debug!(
                target: "auth.token",
                expected = %expected,
                actual = %claims.token_use,
                "Token rejected: wrong token_use"
            );
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}
