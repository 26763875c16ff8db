//! HTTP request handlers.

use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};

use crate::http::responses::ErrorResponse;

mod health;
mod tasks;

pub use health::{health_check, liveness_probe, metrics_handler, readiness_probe, root};
pub use tasks::{create_task, delete_task, get_task, list_tasks, update_task_status};

/// Fallback for paths with no route.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("No route for {}", uri.path()),
            code: "NOT_FOUND".to_string(),
            from: None,
            to: None,
        }),
    )
}
