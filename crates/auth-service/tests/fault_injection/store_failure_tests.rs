//! Store outage tests.
//!
//! Audit failures must never block authentication. Credential and ledger
//! failures surface as an opaque internal error.

use auth_service::errors::{LoginError, RefreshError, RegisterError, RevokeError};
use auth_test_utils::{TestAuthServer, TestAuthService, TEST_EMAIL_ALICE, TEST_PASSWORD};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_login_succeeds_while_audit_store_is_down() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    harness.login_attempts.set_unavailable(true);

    let pair = harness
        .service
        .login(TEST_EMAIL_ALICE, TEST_PASSWORD, None)
        .await?;
    assert!(harness.service.tokens().is_valid(&pair.access_token));

    // Failed logins stay Unauthorized, not Internal
    assert_eq!(
        harness
            .service
            .login(TEST_EMAIL_ALICE, "wrong", None)
            .await
            .unwrap_err(),
        LoginError::Unauthorized
    );

    harness.login_attempts.set_unavailable(false);
    assert!(harness.login_attempts.all().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_credential_store_outage_is_internal() {
    let harness = TestAuthService::new();
    harness.credentials.set_unavailable(true);

    assert_eq!(
        harness
            .service
            .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
            .await
            .unwrap_err(),
        RegisterError::Internal
    );
    assert_eq!(
        harness
            .service
            .login(TEST_EMAIL_ALICE, TEST_PASSWORD, None)
            .await
            .unwrap_err(),
        LoginError::Internal
    );
}

#[tokio::test]
async fn test_ledger_outage_during_registration_is_internal() {
    let harness = TestAuthService::new();
    harness.refresh_tokens.set_unavailable(true);

    assert_eq!(
        harness
            .service
            .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
            .await
            .unwrap_err(),
        RegisterError::Internal
    );
}

#[tokio::test]
async fn test_ledger_outage_during_refresh_is_internal() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    harness.refresh_tokens.set_unavailable(true);

    assert_eq!(
        harness
            .service
            .refresh(&registered.tokens.refresh_token)
            .await
            .unwrap_err(),
        RefreshError::Internal
    );
    assert_eq!(
        harness
            .service
            .revoke_all_sessions(registered.user_id)
            .await
            .unwrap_err(),
        RevokeError::Internal
    );

    // The token was not consumed by the failed attempt
    harness.refresh_tokens.set_unavailable(false);
    assert!(harness
        .service
        .refresh(&registered.tokens.refresh_token)
        .await
        .is_ok());
    Ok(())
}

#[tokio::test]
async fn test_internal_error_body_leaks_nothing() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server
        .harness()
        .expect("in-memory")
        .credentials
        .set_unavailable(true);

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/auth/login", server.url()))
        .json(&json!({"email": TEST_EMAIL_ALICE, "password": TEST_PASSWORD}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({"error": {"code": "INTERNAL_ERROR", "message": "An internal error occurred"}})
    );
    Ok(())
}
