use auth_service::config::Config;
use auth_service::crypto::{KeyMaterial, PasswordHasher};
use auth_service::handlers::AppState;
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::repositories::{PgCredentialStore, PgLoginAttemptStore, PgRefreshTokenStore};
use auth_service::routes;
use auth_service::services::token_service::{TokenConfig, TokenService};
use auth_service::services::{AuthService, Stores};
use common::secret::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Auth Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    // Key material is required; the service cannot sign or verify without it
    let keys = KeyMaterial::load(&config.private_key_path, &config.public_key_path).map_err(|e| {
        error!("Failed to load key material: {}", e);
        e
    })?;

    info!(kid = %keys.kid(), "Signing keypair loaded");

    // Initialize database connection pool
    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    info!("Database connection established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            e
        })?;

    info!("Database migrations applied");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let hasher = PasswordHasher::new(config.bcrypt_cost)?;
    let tokens = TokenService::new(Arc::new(keys), TokenConfig::from(&config));
    let stores = Stores {
        credentials: Arc::new(PgCredentialStore::new(db_pool.clone())),
        refresh_tokens: Arc::new(PgRefreshTokenStore::new(db_pool.clone())),
        login_attempts: Arc::new(PgLoginAttemptStore::new(db_pool)),
    };
    let auth = AuthService::new(tokens, hasher, stores)?;

    // Parse bind address before moving config
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState { auth, config });
    let app = routes::build_routes(state, metrics_handle);

    info!("Auth Service listening on {}", addr);

    // Start server with ConnectInfo support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
