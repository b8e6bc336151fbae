//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions over the unverified structure of a JWT.
//! Signature checks belong to the service under test; these only inspect
//! what the token claims to be.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub token_use: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing segment {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {}", index, e))
}

fn header(token: &str) -> JwtHeader {
    serde_json::from_slice(&segment(token, 0)).expect("Failed to parse JWT header")
}

fn claims(token: &str) -> JwtClaims {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims")
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_token_use("access")
///     .assert_has_role("USER")
///     .assert_signed_by(keys.kid());
/// ```
pub trait TokenAssertions {
    /// Assert the token is a three-part RS256 JWT with a `kid`
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the `token_use` claim (`access` or `refresh`)
    fn assert_token_use(&self, token_use: &str) -> &Self;

    /// Assert the `roles` claim contains `role`
    fn assert_has_role(&self, role: &str) -> &Self;

    /// Assert the header `kid`
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert `exp - iat` equals `seconds`
    fn assert_expires_in(&self, seconds: i64) -> &Self;

    /// Assert the `sub` claim
    fn assert_for_subject(&self, subject: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header = header(self);
        assert_eq!(header.alg, "RS256", "Expected RS256 algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");
        assert!(header.kid.is_some(), "Expected a kid header");

        let claims = claims(self);
        assert!(claims.exp > claims.iat, "exp must be after iat");

        self
    }

    fn assert_token_use(&self, token_use: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.token_use, token_use,
            "Expected token_use '{}', got '{}'",
            token_use, claims.token_use
        );
        self
    }

    fn assert_has_role(&self, role: &str) -> &Self {
        let claims = claims(self);
        assert!(
            claims.roles.iter().any(|r| r == role),
            "Token does not carry role '{}'. Roles: {:?}",
            role,
            claims.roles
        );
        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = header(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(key_id),
            "Expected key_id '{}', got {:?}",
            key_id,
            header.kid
        );
        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.exp - claims.iat,
            seconds,
            "Expected lifetime of {}s, got {}s",
            seconds,
            claims.exp - claims.iat
        );
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{}', got '{}'",
            subject, claims.sub
        );
        self
    }
}
