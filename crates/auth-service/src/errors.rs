//! Error types, one closed enum per operation.
//!
//! Every caller-visible error maps to a status code and a
//! `{"error": {"code", "message"}}` body. Internal causes are logged where
//! they occur and never reach the response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Storage collaborator failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated")]
    Conflict,

    #[error("Database error: {0}")]
    Database(String),
}

/// Password hashing and token signing failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid bcrypt cost: {0}")]
    InvalidCost(u32),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("JWT signing operation failed: {0}")]
    Signing(String),
}

/// Failure to mint or persist a new token pair.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Token verification outcome.
///
/// Everything except expiry collapses into `Invalid` so callers cannot
/// distinguish a forged signature from a wrong issuer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("The token is invalid")]
    Invalid,

    #[error("The token has expired")]
    Expired,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Email already registered")]
    Conflict,

    #[error("Internal server error")]
    Internal,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Internal server error")]
    Internal,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RefreshError {
    #[error("The refresh token is invalid")]
    Invalid,

    #[error("The refresh token has expired")]
    Expired,

    #[error("The refresh token has been revoked")]
    Revoked,

    #[error("The refresh token is not recognized")]
    NotFound,

    #[error("Internal server error")]
    Internal,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RevokeError {
    #[error("The token is invalid or expired")]
    Invalid,

    #[error("Internal server error")]
    Internal,
}

impl From<TokenError> for RefreshError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => RefreshError::Invalid,
            TokenError::Expired => RefreshError::Expired,
        }
    }
}

impl From<StoreError> for RefreshError {
    fn from(err: StoreError) -> Self {
        tracing::error!(target: "auth.ledger", error = %err, "Refresh token store failure");
        RefreshError::Internal
    }
}

impl From<CryptoError> for RefreshError {
    fn from(err: CryptoError) -> Self {
        tracing::error!(target: "auth.ledger", error = %err, "Token minting failure");
        RefreshError::Internal
    }
}

impl From<IssueError> for RefreshError {
    fn from(err: IssueError) -> Self {
        tracing::error!(target: "auth.ledger", error = %err, "Token issuance failure");
        RefreshError::Internal
    }
}

impl From<StoreError> for RegisterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => RegisterError::Conflict,
            StoreError::Database(_) => {
                tracing::error!(target: "auth.service", error = %err, "Credential store failure");
                RegisterError::Internal
            }
        }
    }
}

impl From<CryptoError> for RegisterError {
    fn from(err: CryptoError) -> Self {
        tracing::error!(target: "auth.service", error = %err, "Password hashing failure");
        RegisterError::Internal
    }
}

impl From<StoreError> for LoginError {
    fn from(err: StoreError) -> Self {
        tracing::error!(target: "auth.service", error = %err, "Credential store failure");
        LoginError::Internal
    }
}

impl From<IssueError> for RegisterError {
    fn from(err: IssueError) -> Self {
        tracing::error!(target: "auth.service", error = %err, "Token issuance failure");
        RegisterError::Internal
    }
}

impl From<IssueError> for LoginError {
    fn from(err: IssueError) -> Self {
        tracing::error!(target: "auth.service", error = %err, "Token issuance failure");
        LoginError::Internal
    }
}

impl From<TokenError> for RevokeError {
    fn from(_: TokenError) -> Self {
        RevokeError::Invalid
    }
}

impl From<StoreError> for RevokeError {
    fn from(err: StoreError) -> Self {
        tracing::error!(target: "auth.ledger", error = %err, "Refresh token store failure");
        RevokeError::Internal
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        },
    };

    (status, Json(body)).into_response()
}

fn internal_error_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred",
    )
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        match self {
            RegisterError::InvalidInput(reason) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_INPUT", &reason)
            }
            RegisterError::Conflict => error_response(
                StatusCode::CONFLICT,
                "EMAIL_ALREADY_REGISTERED",
                "An account with this email already exists",
            ),
            RegisterError::Internal => internal_error_response(),
        }
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match self {
            LoginError::Unauthorized => error_response(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password",
            ),
            LoginError::Internal => internal_error_response(),
        }
    }
}

impl IntoResponse for RefreshError {
    fn into_response(self) -> Response {
        let code = match self {
            RefreshError::Invalid | RefreshError::NotFound => "INVALID_TOKEN",
            RefreshError::Expired => "TOKEN_EXPIRED",
            RefreshError::Revoked => "TOKEN_REVOKED",
            RefreshError::Internal => return internal_error_response(),
        };

        error_response(StatusCode::UNAUTHORIZED, code, "Please authenticate again")
    }
}

impl IntoResponse for RevokeError {
    fn into_response(self) -> Response {
        match self {
            RevokeError::Invalid => error_response(
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "The token is invalid or expired",
            ),
            RevokeError::Internal => internal_error_response(),
        }
    }
}
