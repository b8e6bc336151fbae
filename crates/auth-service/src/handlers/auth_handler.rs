use crate::config::Config;
use crate::errors::{LoginError, RefreshError, RegisterError, RevokeError};
use crate::models::{RegisterResponse, RevokedSessions, TokenPair};
use crate::services::AuthService;
use axum::{
    extract::{ConnectInfo, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use common::secret::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub config: Config,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: SecretString,
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), RegisterError> {
    let response = state
        .auth
        .register(&payload.email, payload.password.expose_secret())
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
///
/// The peer address is recorded with the attempt when the server was started
/// with `ConnectInfo`.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<TokenPair>, LoginError> {
    let ip_address = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());

    let tokens = state
        .auth
        .login(
            &payload.email,
            payload.password.expose_secret(),
            ip_address.as_deref(),
        )
        .await?;

    Ok(Json(tokens))
}

/// POST /api/v1/auth/refresh
pub async fn handle_refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, RefreshError> {
    let tokens = state
        .auth
        .refresh(payload.refresh_token.expose_secret())
        .await?;
    Ok(Json(tokens))
}

/// POST /api/v1/auth/logout
///
/// Revokes the presented refresh token. Repeating the call is harmless.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<StatusCode, RevokeError> {
    state
        .auth
        .revoke_session(payload.refresh_token.expose_secret())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/sessions/revoke
///
/// Revokes every session of the caller identified by the bearer access token.
pub async fn handle_revoke_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RevokedSessions>, RevokeError> {
    let token = bearer_token(&headers).ok_or(RevokeError::Invalid)?;
    let user_id = state.auth.authenticate_access_token(token)?;

    let revoked = state.auth.revoke_all_sessions(user_id).await?;
    Ok(Json(revoked))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
