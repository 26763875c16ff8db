//! Task types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CoreError, TaskId, TaskStatus};

/// A Task represents one caller-submitted unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Caller-supplied identifier, immutable after creation.
    pub id: TaskId,

    /// Opaque caller data, stored and returned verbatim.
    pub payload: Value,

    /// Informational ordering hint.
    pub priority: i64,

    /// Current task status.
    pub status: TaskStatus,

    /// Outcome attached by background processing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    /// When the task was created.
    pub created_at: DateTime<Utc>,

    /// When the task was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new PENDING Task stamped with the current time.
    pub fn new(id: impl Into<TaskId>, payload: Value, priority: i64) -> Self {
        Self::new_at(id, payload, priority, Utc::now())
    }

    /// Create a new PENDING Task with an explicit creation time.
    pub fn new_at(id: impl Into<TaskId>, payload: Value, priority: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            payload,
            priority,
            status: TaskStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move the task to `next`, stamping `updated_at`.
    ///
    /// On error the task is left untouched. `updated_at` never moves
    /// backwards, even if the wall clock does.
    pub fn transition(&mut self, next: TaskStatus, now: DateTime<Utc>) -> Result<TaskStatus, CoreError> {
        self.status.check_transition(next)?;
        let previous = self.status;
        self.status = next;
        self.touch(now);
        Ok(previous)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at);
    }
}

/// Outcome recorded when a task is processed to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// When processing finished.
    pub processed_at: DateTime<Utc>,

    /// Human-readable outcome.
    pub message: String,
}

impl TaskResult {
    /// Create a result stamped with the current time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            processed_at: Utc::now(),
            message: message.into(),
        }
    }
}
