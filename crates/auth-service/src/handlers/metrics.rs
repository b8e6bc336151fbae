use axum::extract::State;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics
///
/// Prometheus text exposition of every metric recorded by the service.
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
