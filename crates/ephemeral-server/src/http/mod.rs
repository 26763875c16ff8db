//! HTTP facade over the task registry.
//!
//! Provides endpoints for:
//! - Task CRUD (`/tasks`, `/tasks/:task_id`, `/tasks/:task_id/status`)
//! - Orchestrator probes (`/health/live`, `/health/ready`)
//! - Service info (`/`, `/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
mod metrics_layer;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Task routes
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/tasks/:task_id",
            get(handlers::get_task).delete(handlers::delete_task),
        )
        .route("/tasks/:task_id/status", put(handlers::update_task_status))
        // Observability routes
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::liveness_probe))
        .route("/health/ready", get(handlers::readiness_probe))
        .route("/metrics", get(handlers::metrics_handler))
        .fallback(handlers::not_found)
        // Wraps every route and the fallback; only routes carry a MatchedPath.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics_layer::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
