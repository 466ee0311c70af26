//! Operational endpoints: health and Prometheus metrics.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use super::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `"memory"` or `"postgres"`.
    pub storage: &'static str,
}

/// GET /health: returns process health and the active storage backend.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage: state.storage,
    })
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
