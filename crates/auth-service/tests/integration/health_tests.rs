//! Tests for the operational endpoints.

use auth_test_utils::{TestAuthServer, TEST_EMAIL_ALICE, TEST_PASSWORD};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_serves_prometheus_text() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    // Body depends on which recorder the process installed first; it must
    // at least be text.
    response.text().await?;
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/auth/token", server.url()))
        .json(&json!({"email": TEST_EMAIL_ALICE, "password": TEST_PASSWORD}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
