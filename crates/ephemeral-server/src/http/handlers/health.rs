//! Health, probe and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::http::responses::{HealthResponse, ProbeResponse};
use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service info.
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "Ephemeral Task Service",
        "version": VERSION,
        "tasks": state.task_count(),
        "health": "/health",
        "metrics": "/metrics",
    }))
}

/// Informational health summary. Always 200; probes use the endpoints below.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.health.report();
    Json(HealthResponse {
        status: if report.live { "healthy" } else { "unhealthy" },
        timestamp: Utc::now(),
        version: VERSION,
        environment: state.environment.clone(),
        report,
    })
}

/// Liveness probe: 503 tells the orchestrator to replace this instance.
pub async fn liveness_probe(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    probe(state.health.is_live(), "alive", "dead")
}

/// Readiness probe: 503 while starting, draining or over capacity.
pub async fn readiness_probe(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    probe(state.health.is_ready(), "ready", "not_ready")
}

fn probe(ok: bool, up: &'static str, down: &'static str) -> impl IntoResponse {
    let (code, status) = if ok {
        (StatusCode::OK, up)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, down)
    };
    (
        code,
        Json(ProbeResponse {
            status,
            timestamp: Utc::now(),
        }),
    )
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = crate::metrics::collect_metrics(&state);
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
