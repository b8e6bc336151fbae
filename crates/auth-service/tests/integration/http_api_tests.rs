//! HTTP tests for the `/api/v1/auth` endpoints.
//!
//! Status codes and error codes are part of the contract with clients.

use auth_service::handlers::AppState;
use auth_service::routes::build_routes;
use auth_test_utils::{
    test_config, TestAuthServer, TestAuthService, TokenAssertions, TEST_EMAIL_ALICE, TEST_PASSWORD,
    TEST_WRONG_PASSWORD,
};
use axum::body::Body;
use axum::http::{Request, StatusCode as AxumStatus};
use http_body_util::BodyExt;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn register(server: &TestAuthServer, email: &str) -> Result<Value, anyhow::Error> {
    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/auth/register", server.url()))
        .json(&json!({"email": email, "password": TEST_PASSWORD}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    Ok(response.json().await?)
}

async fn post_json(
    server: &TestAuthServer,
    path: &str,
    body: Value,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .post(format!("{}{}", server.url(), path))
        .json(&body)
        .send()
        .await?)
}

async fn error_code(response: reqwest::Response) -> Result<String, anyhow::Error> {
    let body: Value = response.json().await?;
    Ok(body["error"]["code"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn test_register_returns_201_with_tokens() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let body = register(&server, TEST_EMAIL_ALICE).await?;

    let user_id = body["user_id"].as_str().expect("user_id").to_string();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    body["access_token"]
        .as_str()
        .expect("access_token")
        .to_string()
        .assert_valid_jwt()
        .assert_for_subject(&user_id);

    Ok(())
}

#[tokio::test]
async fn test_register_duplicate_returns_409() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    register(&server, TEST_EMAIL_ALICE).await?;

    let response = post_json(
        &server,
        "/api/v1/auth/register",
        json!({"email": TEST_EMAIL_ALICE, "password": "another"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(response).await?, "EMAIL_ALREADY_REGISTERED");
    Ok(())
}

#[tokio::test]
async fn test_register_bad_email_returns_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = post_json(
        &server,
        "/api/v1/auth/register",
        json!({"email": "nope", "password": TEST_PASSWORD}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await?, "INVALID_INPUT");
    Ok(())
}

#[tokio::test]
async fn test_login_records_peer_address() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    register(&server, TEST_EMAIL_ALICE).await?;

    let response = post_json(
        &server,
        "/api/v1/auth/login",
        json!({"email": TEST_EMAIL_ALICE, "password": TEST_PASSWORD}),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let attempts = server.harness().expect("in-memory").login_attempts.all().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].ip_address.as_deref(), Some("127.0.0.1"));
    Ok(())
}

#[tokio::test]
async fn test_login_wrong_password_returns_401() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    register(&server, TEST_EMAIL_ALICE).await?;

    let wrong = post_json(
        &server,
        "/api/v1/auth/login",
        json!({"email": TEST_EMAIL_ALICE, "password": TEST_WRONG_PASSWORD}),
    )
    .await?;
    let unknown = post_json(
        &server,
        "/api/v1/auth/login",
        json!({"email": "ghost@example.com", "password": TEST_PASSWORD}),
    )
    .await?;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let wrong_body: Value = wrong.json().await?;
    let unknown_body: Value = unknown.json().await?;
    assert_eq!(wrong_body, unknown_body);
    Ok(())
}

#[tokio::test]
async fn test_refresh_replay_returns_token_revoked() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = register(&server, TEST_EMAIL_ALICE).await?;
    let refresh_token = registered["refresh_token"].clone();

    let first = post_json(
        &server,
        "/api/v1/auth/refresh",
        json!({"refresh_token": refresh_token}),
    )
    .await?;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = post_json(
        &server,
        "/api/v1/auth/refresh",
        json!({"refresh_token": refresh_token}),
    )
    .await?;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(replay).await?, "TOKEN_REVOKED");
    Ok(())
}

#[tokio::test]
async fn test_refresh_garbage_returns_invalid_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = post_json(
        &server,
        "/api/v1/auth/refresh",
        json!({"refresh_token": "not-a-token"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn test_logout_returns_204_and_blocks_refresh() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = register(&server, TEST_EMAIL_ALICE).await?;
    let refresh_token = registered["refresh_token"].clone();

    for _ in 0..2 {
        let response = post_json(
            &server,
            "/api/v1/auth/logout",
            json!({"refresh_token": refresh_token}),
        )
        .await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let refresh = post_json(
        &server,
        "/api/v1/auth/refresh",
        json!({"refresh_token": refresh_token}),
    )
    .await?;
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_revoke_all_requires_access_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let registered = register(&server, TEST_EMAIL_ALICE).await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/auth/sessions/revoke", server.url());

    let missing = client.post(&url).send().await?;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let with_refresh = client
        .post(&url)
        .bearer_auth(registered["refresh_token"].as_str().expect("refresh_token"))
        .send()
        .await?;
    assert_eq!(with_refresh.status(), StatusCode::UNAUTHORIZED);

    let with_access = client
        .post(&url)
        .bearer_auth(registered["access_token"].as_str().expect("access_token"))
        .send()
        .await?;
    assert_eq!(with_access.status(), StatusCode::OK);
    let body: Value = with_access.json().await?;
    assert_eq!(body["revoked"], 1);

    Ok(())
}

/// Without `ConnectInfo` the login still succeeds; the attempt has no address.
#[tokio::test]
async fn test_login_without_connect_info() -> Result<(), anyhow::Error> {
    let harness = TestAuthService::new();
    harness
        .service
        .register(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?;
    let state = Arc::new(AppState {
        auth: harness.service.clone(),
        config: test_config(),
    });
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let app = build_routes(state, recorder.handle());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"email": TEST_EMAIL_ALICE, "password": TEST_PASSWORD}).to_string(),
        ))?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), AxumStatus::OK);
    let bytes = response.into_body().collect().await?.to_bytes();
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["token_type"], "Bearer");

    let attempts = harness.login_attempts.all().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].ip_address, None);
    Ok(())
}
