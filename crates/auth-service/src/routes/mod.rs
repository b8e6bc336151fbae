use crate::handlers::{self, auth_handler, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// - `/api/v1/auth/*` - register, login, refresh, logout, revoke all sessions
/// - `/health` - liveness probe
/// - `/metrics` - Prometheus metrics
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(auth_handler::handle_register))
        .route("/api/v1/auth/login", post(auth_handler::handle_login))
        .route("/api/v1/auth/refresh", post(auth_handler::handle_refresh))
        .route("/api/v1/auth/logout", post(auth_handler::handle_logout))
        .route(
            "/api/v1/auth/sessions/revoke",
            post(auth_handler::handle_revoke_all),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    auth_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
}
