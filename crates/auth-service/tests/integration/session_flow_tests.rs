//! End-to-end session flows through `AuthService` over the in-memory stores.
//!
//! ## Test Naming
//!
//! Tests follow the convention: `test_<feature>_<scenario>_<expected_result>`

use auth_service::crypto::hash_refresh_token;
use auth_service::errors::{LoginError, RefreshError, RegisterError, RevokeError};
use auth_service::models::RefreshTokenRecord;
use auth_service::repositories::RefreshTokenStore;
use auth_test_utils::{
    test_key_material, test_token_config, TestAuthService, TokenAssertions, TEST_EMAIL_ALICE,
    TEST_EMAIL_BOB, TEST_IP, TEST_PASSWORD, TEST_WRONG_PASSWORD,
};
use chrono::Utc;
use uuid::Uuid;

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_issues_pair_with_default_role() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();

    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;

    let kid = test_key_material().kid().to_string();
    registered
        .tokens
        .access_token
        .assert_valid_jwt()
        .assert_token_use("access")
        .assert_has_role("USER")
        .assert_signed_by(&kid)
        .assert_expires_in(15 * 60)
        .assert_for_subject(&registered.user_id.to_string());
    registered
        .tokens
        .refresh_token
        .assert_valid_jwt()
        .assert_token_use("refresh")
        .assert_expires_in(7 * 24 * 3600);

    let active = harness
        .service
        .ledger()
        .active_sessions(registered.user_id)
        .await?;
    assert_eq!(active, 1);

    Ok(())
}

#[tokio::test]
async fn test_register_same_email_twice_conflicts() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();

    harness.service.register("a@x.com", "pw").await?;
    let second = harness.service.register("a@x.com", "pw2").await;

    assert_eq!(second.unwrap_err(), RegisterError::Conflict);
    Ok(())
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_correct_password_records_success() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;

    let pair = harness
        .service
        .login(TEST_EMAIL_ALICE, TEST_PASSWORD, Some(TEST_IP))
        .await?;
    assert!(harness.service.tokens().is_valid(&pair.access_token));

    let attempts = harness.login_attempts.all().await;
    assert_eq!(attempts.len(), 1);
    let attempt = attempts.first().expect("one attempt");
    assert!(attempt.success);
    assert_eq!(attempt.ip_address.as_deref(), Some(TEST_IP));

    Ok(())
}

#[tokio::test]
async fn test_login_wrong_password_records_failure() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;

    let result = harness
        .service
        .login(TEST_EMAIL_ALICE, TEST_WRONG_PASSWORD, Some(TEST_IP))
        .await;

    assert_eq!(result.unwrap_err(), LoginError::Unauthorized);
    let attempts = harness.login_attempts.all().await;
    assert_eq!(attempts.len(), 1);
    assert!(!attempts.first().expect("one attempt").success);

    Ok(())
}

#[tokio::test]
async fn test_login_unknown_email_is_unauthorized_and_recorded() {
    let harness = TestAuthService::new();

    let result = harness
        .service
        .login(TEST_EMAIL_BOB, TEST_PASSWORD, None)
        .await;

    assert_eq!(result.unwrap_err(), LoginError::Unauthorized);
    let attempts = harness.login_attempts.all().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts.first().expect("one attempt").email, TEST_EMAIL_BOB);
}

// ============================================================================
// Refresh rotation
// ============================================================================

#[tokio::test]
async fn test_refresh_consumes_token_exactly_once() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    let presented = registered.tokens.refresh_token;

    let rotated = harness.service.refresh(&presented).await?;
    assert_ne!(rotated.refresh_token, presented);
    rotated
        .access_token
        .assert_for_subject(&registered.user_id.to_string());

    let replay = harness.service.refresh(&presented).await;
    assert_eq!(replay.unwrap_err(), RefreshError::Revoked);

    Ok(())
}

#[tokio::test]
async fn test_refresh_reuse_revokes_every_session() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    let laptop = harness
        .service
        .login(TEST_EMAIL_ALICE, TEST_PASSWORD, None)
        .await?;

    let rotated = harness
        .service
        .refresh(&registered.tokens.refresh_token)
        .await?;

    // Replaying the consumed token signals compromise
    let replay = harness
        .service
        .refresh(&registered.tokens.refresh_token)
        .await;
    assert_eq!(replay.unwrap_err(), RefreshError::Revoked);

    assert_eq!(
        harness
            .service
            .ledger()
            .active_sessions(registered.user_id)
            .await?,
        0
    );
    for token in [&laptop.refresh_token, &rotated.refresh_token] {
        assert_eq!(
            harness.service.refresh(token).await.unwrap_err(),
            RefreshError::Revoked
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_refresh_reuse_leaves_other_users_alone() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let alice = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    let bob = harness
        .service
        .register(TEST_EMAIL_BOB, TEST_PASSWORD)
        .await?;

    harness.service.refresh(&alice.tokens.refresh_token).await?;
    let _ = harness.service.refresh(&alice.tokens.refresh_token).await;

    assert!(harness.service.refresh(&bob.tokens.refresh_token).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_refresh_after_record_expiry_is_expired() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;

    // A validly signed token whose ledger record has lapsed
    let token = harness
        .service
        .tokens()
        .issue_refresh_token(registered.user_id)?
        .token;
    let now = Utc::now();
    harness
        .refresh_tokens
        .insert_raw(RefreshTokenRecord {
            token_id: Uuid::new_v4(),
            user_id: registered.user_id,
            token_hash: hash_refresh_token(&token),
            revoked: false,
            created_at: now - chrono::Duration::days(8),
            expires_at: now - chrono::Duration::seconds(1),
        })
        .await;

    assert_eq!(
        harness.service.refresh(&token).await.unwrap_err(),
        RefreshError::Expired
    );
    Ok(())
}

#[tokio::test]
async fn test_refresh_after_jwt_expiry_is_expired() -> Result<(), anyhow::Error> {
    let mut config = test_token_config();
    config.refresh_ttl = chrono::Duration::seconds(-1);
    let harness = TestAuthService::with_token_config(config);

    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;

    assert_eq!(
        harness
            .service
            .refresh(&registered.tokens.refresh_token)
            .await
            .unwrap_err(),
        RefreshError::Expired
    );
    Ok(())
}

#[tokio::test]
async fn test_refresh_with_access_token_is_invalid() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;

    assert_eq!(
        harness
            .service
            .refresh(&registered.tokens.access_token)
            .await
            .unwrap_err(),
        RefreshError::Invalid
    );
    Ok(())
}

#[tokio::test]
async fn test_refresh_with_unpersisted_token_is_not_found() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;

    let stray = harness
        .service
        .tokens()
        .issue_refresh_token(registered.user_id)?
        .token;

    assert!(harness
        .refresh_tokens
        .find_by_hash(&hash_refresh_token(&stray))
        .await?
        .is_none());
    assert_eq!(
        harness.service.refresh(&stray).await.unwrap_err(),
        RefreshError::NotFound
    );
    Ok(())
}

// ============================================================================
// Revocation
// ============================================================================

#[tokio::test]
async fn test_logout_revokes_only_that_session() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    let phone = harness
        .service
        .login(TEST_EMAIL_ALICE, TEST_PASSWORD, None)
        .await?;

    assert!(
        harness
            .service
            .revoke_session(&registered.tokens.refresh_token)
            .await?
    );
    assert!(
        !harness
            .service
            .revoke_session(&registered.tokens.refresh_token)
            .await?
    );

    assert!(harness.service.refresh(&phone.refresh_token).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_logout_with_garbage_is_invalid() {
    let harness = TestAuthService::new();

    assert_eq!(
        harness.service.revoke_session("x.y.z").await.unwrap_err(),
        RevokeError::Invalid
    );
}

#[tokio::test]
async fn test_revoke_all_is_idempotent() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    harness
        .service
        .login(TEST_EMAIL_ALICE, TEST_PASSWORD, None)
        .await?;

    let first = harness
        .service
        .revoke_all_sessions(registered.user_id)
        .await?;
    let second = harness
        .service
        .revoke_all_sessions(registered.user_id)
        .await?;

    assert_eq!(first.revoked, 2);
    assert_eq!(second.revoked, 0);
    Ok(())
}
