//! HTTP request handlers.

pub mod auth_handler;
pub mod metrics;

pub use auth_handler::AppState;
pub use metrics::metrics_handler;

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
