//! Observability for the auth service.
//!
//! # Privacy by Default
//!
//! Service entry points use `#[instrument(skip_all)]` and add fields
//! explicitly. Fields fall into three groups:
//! - **SAFE**: logged as-is (outcomes, token kinds, counts)
//! - **HASHED**: logged as a truncated SHA-256 for correlation (email, user id)
//! - **NEVER**: never logged (passwords, tokens, hashes, key material)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// A one-way hash for correlating log lines about the same user, not a
/// secret-protection primitive.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let prefix: Vec<u8> = digest.iter().take(4).copied().collect();
    hex::encode(prefix)
}

/// Error categories for metrics labels (bounded cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad credentials
    Authentication,
    /// Invalid, expired, revoked or unknown tokens
    Token,
    /// Rejected input
    Validation,
    /// Storage or crypto failures
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Token => "token",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&crate::errors::RegisterError> for ErrorCategory {
    fn from(err: &crate::errors::RegisterError) -> Self {
        use crate::errors::RegisterError;
        match err {
            RegisterError::InvalidInput(_) | RegisterError::Conflict => ErrorCategory::Validation,
            RegisterError::Internal => ErrorCategory::Internal,
        }
    }
}

impl From<&crate::errors::LoginError> for ErrorCategory {
    fn from(err: &crate::errors::LoginError) -> Self {
        use crate::errors::LoginError;
        match err {
            LoginError::Unauthorized => ErrorCategory::Authentication,
            LoginError::Internal => ErrorCategory::Internal,
        }
    }
}

impl From<&crate::errors::RefreshError> for ErrorCategory {
    fn from(err: &crate::errors::RefreshError) -> Self {
        use crate::errors::RefreshError;
        match err {
            RefreshError::Internal => ErrorCategory::Internal,
            _ => ErrorCategory::Token,
        }
    }
}
