//! JWT utilities shared by the token issuer and offline verifiers.
//!
//! This module provides the pieces any holder of the public key needs to
//! validate a bearer token consistently with the issuer:
//! - Size limit for DoS prevention
//! - Clock skew constants for iat validation
//! - Key ID extraction from JWT headers
//! - PEM body decoding for key files
//! - The `token_use` discriminator carried by every token
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Error messages are generic to prevent information leakage

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (4KB).
///
/// An RS256 token with a 2048-bit key and role claims is ~700 bytes. Anything
/// larger than this limit is rejected before base64 decoding or signature
/// verification.
pub const MAX_JWT_SIZE_BYTES: usize = 4096;

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Tokens with `iat` (issued-at) timestamps more than this amount in the
/// future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural JWT checks.
///
/// Messages are intentionally generic. Detail is logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The token is invalid or expired")]
    MissingKid,

    /// Token `iat` claim is too far in the future.
    #[error("The token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Claim Types
// =============================================================================

/// Discriminates access tokens from refresh tokens.
///
/// Both kinds share the same signing key and structure, so the `token_use`
/// claim is what stops an access token from being presented where a refresh
/// token is expected (and vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUse {
    /// Short-lived bearer credential for API calls.
    Access,
    /// Long-lived, one-time-use credential for rotation.
    Refresh,
}

impl TokenUse {
    /// Wire representation of the discriminator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenUse::Access => "access",
            TokenUse::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The `kid` value should only be used for key lookup
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds size limit
/// - `MalformedToken` - Wrong structure, bad base64, invalid JSON
/// - `MissingKid` - Header missing `kid` or `kid` is not a non-empty string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens with `iat` more than `clock_skew` in the future, which
/// indicates pre-generated tokens or a drifting clock on the issuer.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the check fails.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Decode the body of a PEM document into DER bytes.
///
/// Drops the `-----BEGIN ...-----` / `-----END ...-----` armor lines and every
/// whitespace character, then base64-decodes what is left. Works for any PEM
/// label (`PRIVATE KEY`, `PUBLIC KEY`, ...); interpreting the DER is up to the
/// caller.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the remaining content is not base64.
pub fn decode_pem_body(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let b64: String = pem
        .lines()
        .filter(|line| !line.trim_start().starts_with("-----"))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD.decode(b64)
}
