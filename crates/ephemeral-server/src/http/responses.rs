//! HTTP request and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use ephemeral_core::{CoreError, Task, TaskResult, TaskStatus};

use crate::health::HealthReport;

// ============================================================================
// Task types
// ============================================================================

fn default_payload() -> Value {
    Value::Object(Default::default())
}

fn default_priority() -> i64 {
    1
}

/// Request body for creating a task.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Caller-chosen task id.
    pub task_id: String,

    /// Opaque task data.
    #[serde(default = "default_payload")]
    pub data: Value,

    /// Ordering hint.
    #[serde(default = "default_priority")]
    pub priority: i64,
}

/// Request body for changing a task's status.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

/// Query parameters for listing tasks.
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    /// Restrict to one status, case-insensitive.
    pub status: Option<String>,
}

/// Response for a single task.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub data: Value,
    pub priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.id.into_inner(),
            status: task.status,
            data: task.payload,
            priority: task.priority,
            result: task.result,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Response for the task list.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<TaskResponse>,
    pub count: usize,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Health types
// ============================================================================

/// Response for `/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub environment: String,
    #[serde(flatten)]
    pub report: HealthReport,
}

/// Response for the liveness and readiness probes.
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<TaskStatus>,
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Registry operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Request could not be decoded.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Core(CoreError::InvalidArgument(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(CoreError::Conflict(_)) | Self::Core(CoreError::InvalidTransition { .. }) => {
                StatusCode::CONFLICT
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match &self {
            Self::Core(e) => e.code(),
            Self::BadRequest(_) => "BAD_REQUEST",
        };
        let (from, to) = match &self {
            Self::Core(CoreError::InvalidTransition { from, to }) => (Some(*from), Some(*to)),
            _ => (None, None),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            from,
            to,
        };
        (self.status_code(), Json(body)).into_response()
    }
}
