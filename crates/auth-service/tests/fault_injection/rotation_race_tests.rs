//! Concurrent rotation of a single refresh token.
//!
//! However many requests race on one token, exactly one rotation may win.

use auth_service::errors::RefreshError;
use auth_test_utils::{TestAuthService, TEST_EMAIL_ALICE, TEST_PASSWORD};
use futures::future::join_all;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_concurrent_refreshes_single_winner() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    let token = registered.tokens.refresh_token;

    let a = tokio::spawn({
        let service = harness.service.clone();
        let token = token.clone();
        async move { service.refresh(&token).await }
    });
    let b = tokio::spawn({
        let service = harness.service.clone();
        let token = token.clone();
        async move { service.refresh(&token).await }
    });

    let results = [a.await?, b.await?];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(RefreshError::Revoked)))
            .count(),
        1
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_refreshes_single_winner() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    let registered = harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    let token = registered.tokens.refresh_token;

    let tasks = (0..16).map(|_| {
        let service = harness.service.clone();
        let token = token.clone();
        tokio::spawn(async move { service.refresh(&token).await })
    });

    let mut successes = 0;
    for joined in join_all(tasks).await {
        match joined? {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err, RefreshError::Revoked),
        }
    }
    assert_eq!(successes, 1);

    // Reuse detection revoked the winner's replacement as well
    assert_eq!(
        harness
            .service
            .ledger()
            .active_sessions(registered.user_id)
            .await?,
        0
    );
    Ok(())
}
