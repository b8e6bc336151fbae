//! Test server harness for HTTP tests
//!
//! Provides TestAuthServer for spawning real auth service instances in tests.

use crate::crypto_fixtures::{
    test_token_config, test_token_service, TEST_ISSUER, TEST_PRIVATE_KEY_PATH,
    TEST_PUBLIC_KEY_PATH,
};
use crate::service_harness::TestAuthService;
use auth_service::config::{
    Config, DEFAULT_DATABASE_MAX_CONNECTIONS, MIN_BCRYPT_COST,
};
use auth_service::crypto::PasswordHasher;
use auth_service::handlers::AppState;
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::repositories::{PgCredentialStore, PgLoginAttemptStore, PgRefreshTokenStore};
use auth_service::routes;
use auth_service::services::{AuthService, Stores};
use common::secret::SecretString;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the auth service in HTTP tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_register_over_http() -> Result<()> {
///     let server = TestAuthServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .post(format!("{}/api/v1/auth/register", server.url()))
///         .json(&json!({"email": "a@example.com", "password": "pw"}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 201);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    config: Config,
    harness: Option<TestAuthService>,
    _handle: JoinHandle<()>,
}

/// Configuration matching the harness-built service.
pub fn test_config() -> Config {
    let tokens = test_token_config();
    Config {
        database_url: SecretString::from(String::new()), // Not used by the harness
        bind_address: "127.0.0.1:0".to_string(),
        database_max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
        jwt_issuer: TEST_ISSUER.to_string(),
        access_token_ttl: tokens.access_ttl,
        refresh_token_ttl: tokens.refresh_ttl,
        private_key_path: PathBuf::from(TEST_PRIVATE_KEY_PATH),
        public_key_path: PathBuf::from(TEST_PUBLIC_KEY_PATH),
        jwt_clock_skew: tokens.clock_skew,
        bcrypt_cost: MIN_BCRYPT_COST,
    }
}

/// The global recorder can only be installed once per process; later
/// servers get a standalone recorder.
fn metrics_handle() -> PrometheusHandle {
    init_metrics_recorder().unwrap_or_else(|_| {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle()
    })
}

impl TestAuthServer {
    /// Spawn a server over the in-memory stores.
    ///
    /// The server binds to a random available port (127.0.0.1:0) and serves
    /// in the background until dropped.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let harness = TestAuthService::new();
        let service = harness.service.clone();
        Self::serve(service, Some(harness)).await
    }

    /// Spawn a server over PostgreSQL (typically a `#[sqlx::test]` pool).
    pub async fn spawn_with_pool(pool: PgPool) -> Result<Self, anyhow::Error> {
        let stores = Stores {
            credentials: Arc::new(PgCredentialStore::new(pool.clone())),
            refresh_tokens: Arc::new(PgRefreshTokenStore::new(pool.clone())),
            login_attempts: Arc::new(PgLoginAttemptStore::new(pool)),
        };
        let hasher = PasswordHasher::new(MIN_BCRYPT_COST)?;
        let service = AuthService::new(test_token_service(test_token_config()), hasher, stores)?;

        Self::serve(service, None).await
    }

    async fn serve(
        service: AuthService,
        harness: Option<TestAuthService>,
    ) -> Result<Self, anyhow::Error> {
        let config = test_config();
        let state = Arc::new(AppState {
            auth: service,
            config: config.clone(),
        });

        // Build routes using the service's real route builder
        let app = routes::build_routes(state, metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            // ConnectInfo lets the login handler record the peer address
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            harness,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// In-memory stores behind the server, when spawned with [`Self::spawn`].
    pub fn harness(&self) -> Option<&TestAuthService> {
        self.harness.as_ref()
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
