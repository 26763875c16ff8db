//! Background task processing.
//!
//! An accepted task stays PENDING for the processing delay, then a spawned
//! tokio task walks it through `RUNNING -> COMPLETED` using the same registry
//! operations as clients. A client that deletes or moves the task first
//! simply wins.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use ephemeral_core::{TaskId, TaskResult, TaskStatus};

use crate::registry::TaskRegistry;

/// Spawns simulated processing for accepted tasks.
#[derive(Debug, Clone)]
pub struct TaskProcessor {
    registry: Arc<TaskRegistry>,
    delay: Duration,
    cancel: CancellationToken,
}

impl TaskProcessor {
    /// Create a processor. A zero `delay` disables processing.
    pub fn new(registry: Arc<TaskRegistry>, delay: Duration) -> Self {
        Self {
            registry,
            delay,
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Start processing `task_id`. Returns `None` when processing is disabled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, task_id: TaskId) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        let registry = self.registry.clone();
        let cancel = self.cancel.clone();
        let delay = self.delay;
        Some(tokio::spawn(async move {
            process(registry, task_id, delay, cancel).await;
        }))
    }

    /// Stop all in-flight processing.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn process(
    registry: Arc<TaskRegistry>,
    task_id: TaskId,
    delay: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!(task_id = %task_id, "Processing interrupted by shutdown");
            return;
        }
        _ = tokio::time::sleep(delay) => {}
    }

    if let Err(e) = registry.update_status(&task_id, TaskStatus::Running) {
        debug!(task_id = %task_id, error = %e, "Skipping processing");
        return;
    }
    info!(task_id = %task_id, "Processing task");

    match registry.complete_with_result(&task_id, TaskResult::new("Task completed successfully")) {
        Ok(_) => info!(task_id = %task_id, "Task completed"),
        Err(e) => debug!(task_id = %task_id, error = %e, "Task changed during processing"),
    }
}
