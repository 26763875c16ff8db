//! Task handlers. Each one delegates to exactly one registry operation.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use ephemeral_core::{TaskId, TaskStatus};

use crate::http::responses::{
    ApiError, CreateTaskRequest, ListTasksQuery, ListTasksResponse, MessageResponse,
    TaskResponse, UpdateStatusRequest,
};
use crate::state::AppState;

/// Create a task and hand it to background processing.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!(task_id = %req.task_id, "Creating task");

    let task = state.registry.create(req.task_id, req.data, req.priority)?;
    state.processor.submit(task.id.clone());

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// List tasks, optionally filtered by `?status=`.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<ListTasksResponse>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()?;

    let tasks: Vec<TaskResponse> = state
        .registry
        .list(status)
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(ListTasksResponse {
        count: tasks.len(),
        tasks,
    }))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.registry.get(&TaskId::new(task_id))?;
    Ok(Json(task.into()))
}

pub async fn update_task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let task = state
        .registry
        .update_status(&TaskId::new(task_id), req.status)?;
    Ok(Json(task.into()))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.registry.delete(&TaskId::new(task_id))?;
    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}
