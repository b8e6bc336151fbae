//! Key material, JWT signing/verification, password hashing and token digests.
//!
//! Access and refresh tokens are RS256 JWTs. The private key only ever lives
//! in this process; anyone holding the public key can verify tokens offline.

use crate::config::{ConfigError, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::{CryptoError, TokenError};
use crate::observability::metrics::{record_bcrypt_duration, record_token_validation};
use common::jwt::{decode_pem_body, validate_iat, TokenUse, MAX_JWT_SIZE_BYTES};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Claim names owned by the token service. Caller-supplied claims with these
/// names are dropped before signing.
pub const RESERVED_CLAIMS: [&str; 8] = [
    "iss",
    "sub",
    "iat",
    "exp",
    "jti",
    "token_use",
    "aud",
    "nbf",
];

// =============================================================================
// Key material
// =============================================================================

/// The process-wide RS256 keypair, loaded once at startup.
pub struct KeyMaterial {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    kid: String,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("kid", &self.kid)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

impl KeyMaterial {
    /// Read a PKCS#8 private key and an X.509 SubjectPublicKeyInfo public key
    /// from PEM files.
    pub fn load(private_key_path: &Path, public_key_path: &Path) -> Result<Self, ConfigError> {
        let private_pem = read_key_file(private_key_path)?;
        let public_pem = read_key_file(public_key_path)?;

        Self::from_pem(&private_pem, &public_pem)
    }

    /// Parse the keypair from PEM strings.
    ///
    /// Fails with `KeyMismatch` when the public key was not derived from the
    /// private key; tokens signed with such a pair would never verify.
    pub fn from_pem(private_pem: &str, public_pem: &str) -> Result<Self, ConfigError> {
        let private_der = decode_pem_body(private_pem).map_err(|e| {
            ConfigError::MalformedKey(format!("private key is not valid base64: {e}"))
        })?;
        let private_key = RsaPrivateKey::from_pkcs8_der(&private_der).map_err(|e| {
            ConfigError::MalformedKey(format!("private key is not a PKCS#8 RSA key: {e}"))
        })?;

        let public_der = decode_pem_body(public_pem).map_err(|e| {
            ConfigError::MalformedKey(format!("public key is not valid base64: {e}"))
        })?;
        let public_key = RsaPublicKey::from_public_key_der(&public_der).map_err(|e| {
            ConfigError::MalformedKey(format!("public key is not an X.509 RSA key: {e}"))
        })?;

        if RsaPublicKey::from(&private_key) != public_key {
            return Err(ConfigError::KeyMismatch);
        }

        // jsonwebtoken takes RSA keys as PKCS#1 DER
        let private_pkcs1 = private_key
            .to_pkcs1_der()
            .map_err(|e| ConfigError::MalformedKey(format!("private key encoding failed: {e}")))?;
        let public_pkcs1 = public_key
            .to_pkcs1_der()
            .map_err(|e| ConfigError::MalformedKey(format!("public key encoding failed: {e}")))?;

        let fingerprint: Vec<u8> = Sha256::digest(&public_der).iter().take(8).copied().collect();
        let kid = hex::encode(fingerprint);

        Ok(Self {
            encoding_key: EncodingKey::from_rsa_der(private_pkcs1.as_bytes()),
            decoding_key: DecodingKey::from_rsa_der(public_pkcs1.as_bytes()),
            kid,
        })
    }

    /// Key id carried in the `kid` header of every token.
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

fn read_key_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::KeyNotFound(path.display().to_string())
        } else {
            ConfigError::MalformedKey(format!("unable to read {}: {e}", path.display()))
        }
    })
}

// =============================================================================
// JWT
// =============================================================================

/// JWT claims for access and refresh tokens.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
    pub token_use: TokenUse,
    /// Caller-supplied claims (roles, email, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &"[REDACTED]")
            .field("token_use", &self.token_use)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Sign claims with the private key (RS256, `typ=JWT`, `kid` header).
#[instrument(skip_all)]
pub fn sign_jwt(claims: &Claims, keys: &KeyMaterial) -> Result<String, CryptoError> {
    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = Some(keys.kid.clone());

    encode(&header, claims, &keys.encoding_key).map_err(|e| CryptoError::Signing(e.to_string()))
}

/// Verify a token's signature, algorithm, issuer, expiry and `iat`.
///
/// Claims are only returned after the signature check has passed. Expiry
/// uses zero leeway.
#[instrument(skip_all)]
pub fn verify_jwt(
    token: &str,
    keys: &KeyMaterial,
    issuer: &str,
    clock_skew: Duration,
) -> Result<Claims, TokenError> {
    // Check token size BEFORE any parsing or cryptographic operations
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "auth.crypto",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        record_token_validation("error", Some("oversized"));
        return Err(TokenError::Invalid);
    }

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &keys.decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "auth.crypto", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::ExpiredSignature => {
                record_token_validation("error", Some("expired"));
                TokenError::Expired
            }
            _ => {
                record_token_validation("error", Some("invalid"));
                TokenError::Invalid
            }
        }
    })?;

    // Reject tokens with iat too far in the future
    if validate_iat(token_data.claims.iat, clock_skew).is_err() {
        record_token_validation("error", Some("clock_skew"));
        return Err(TokenError::Invalid);
    }

    record_token_validation("success", None);
    Ok(token_data.claims)
}

// =============================================================================
// Passwords
// =============================================================================

/// bcrypt wrapper with a validated cost factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, CryptoError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(CryptoError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash with a fresh random salt. The output encodes version, cost and salt.
    #[instrument(skip_all)]
    pub fn hash(&self, password: &str) -> Result<String, CryptoError> {
        let start = Instant::now();
        let result =
            bcrypt::hash(password, self.cost).map_err(|e| CryptoError::Hashing(e.to_string()));
        record_bcrypt_duration("hash", start.elapsed());
        result
    }

    /// Returns `false` on mismatch and on a malformed stored hash.
    #[instrument(skip_all)]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let start = Instant::now();
        let matches = bcrypt::verify(password, hash).unwrap_or_else(|e| {
            tracing::warn!(target: "auth.crypto", error = %e, "Stored password hash is malformed");
            false
        });
        record_bcrypt_duration("verify", start.elapsed());
        matches
    }
}

// =============================================================================
// Refresh token digests
// =============================================================================

/// SHA-256 of the full refresh token string, hex encoded.
///
/// Refresh tokens are signed high-entropy strings, so a fast digest is enough
/// for the at-rest lookup key.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
