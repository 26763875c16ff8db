//! Core domain errors.

use thiserror::Error;

use crate::TaskStatus;

/// Errors returned by task registry operations.
///
/// Every variant is a deterministic outcome of the current registry state,
/// so none of them is worth retrying unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Malformed input, e.g. an empty task id.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Task id already in use.
    #[error("Task already exists: {0}")]
    Conflict(String),

    /// Task not found.
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Status change not permitted from the current state.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

impl CoreError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}
