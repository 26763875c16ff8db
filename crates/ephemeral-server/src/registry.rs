//! In-memory task registry.
//!
//! The registry is the only writer of [`Task`] state. Tasks live in a sharded
//! [`DashMap`]: every operation on one id runs under that id's shard lock, so
//! mutations on the same id are totally ordered, while ids in different
//! shards never contend. Locks are held only for the in-memory mutation and
//! a clone of the result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, error, info};

use ephemeral_core::{CoreError, Task, TaskId, TaskResult, TaskStatus};

use crate::metrics::{Operation, RegistryMetrics};

/// Concurrency-safe store of the tasks owned by this process.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, Task>,

    /// Stored task count, readable without touching any shard lock.
    len: AtomicUsize,

    /// First internal fault detected, if any. Never cleared.
    fault: OnceLock<String>,

    metrics: RegistryMetrics,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new PENDING task.
    ///
    /// Fails with `InvalidArgument` for a blank id and `Conflict` if the id is
    /// already stored; the existing task is never overwritten.
    pub fn create(
        &self,
        id: impl Into<TaskId>,
        payload: Value,
        priority: i64,
    ) -> Result<Task, CoreError> {
        let _timer = self.metrics.time(Operation::Create);
        let id = id.into();
        if id.is_blank() {
            return Err(CoreError::InvalidArgument(
                "task id must not be empty".to_string(),
            ));
        }

        match self.tasks.entry(id) {
            Entry::Occupied(existing) => {
                debug!(task_id = %existing.key(), "Rejected duplicate task id");
                Err(CoreError::Conflict(existing.key().to_string()))
            }
            Entry::Vacant(slot) => {
                let task = Task::new(slot.key().clone(), payload, priority);
                let stored = slot.insert(task);
                // Counted before the shard lock is released so a racing
                // delete can never decrement first.
                self.len.fetch_add(1, Ordering::AcqRel);
                let task = stored.clone();
                drop(stored);

                self.metrics.record_created();
                info!(task_id = %task.id, priority = task.priority, "Task created");
                Ok(task)
            }
        }
    }

    /// Snapshot of one task.
    pub fn get(&self, id: &TaskId) -> Result<Task, CoreError> {
        let _timer = self.metrics.time(Operation::Get);
        let entry = self
            .tasks
            .get(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        self.check_entry(entry.key(), entry.value());
        Ok(entry.value().clone())
    }

    /// Point-in-time snapshot of stored tasks, optionally filtered by status.
    ///
    /// Each returned task is internally consistent; the list as a whole is not
    /// atomic with respect to concurrent creates and deletes. Ordered by
    /// creation time, then id.
    pub fn list(&self, status: Option<TaskStatus>) -> Vec<Task> {
        let _timer = self.metrics.time(Operation::List);
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| status.map_or(true, |s| entry.value().status == s))
            .map(|entry| {
                self.check_entry(entry.key(), entry.value());
                entry.value().clone()
            })
            .collect();
        tasks.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        tasks
    }

    /// Apply a status transition permitted by the task state machine.
    pub fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task, CoreError> {
        let _timer = self.metrics.time(Operation::UpdateStatus);
        self.apply_transition(id, status, None)
    }

    /// Move a RUNNING task to COMPLETED and attach its result.
    pub fn complete_with_result(&self, id: &TaskId, result: TaskResult) -> Result<Task, CoreError> {
        let _timer = self.metrics.time(Operation::UpdateStatus);
        self.apply_transition(id, TaskStatus::Completed, Some(result))
    }

    fn apply_transition(
        &self,
        id: &TaskId,
        status: TaskStatus,
        result: Option<TaskResult>,
    ) -> Result<Task, CoreError> {
        let mut entry = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        let from = entry.transition(status, Utc::now()).inspect_err(|e| {
            debug!(task_id = %id, error = %e, "Rejected status transition");
        })?;
        if result.is_some() {
            entry.result = result;
        }
        let task = entry.clone();
        drop(entry);

        self.metrics.record_transition(from, status);
        info!(task_id = %id, from = %from, to = %status, "Task status changed");
        Ok(task)
    }

    /// Remove a task. Deleting an absent id always reports `NotFound`.
    pub fn delete(&self, id: &TaskId) -> Result<(), CoreError> {
        let _timer = self.metrics.time(Operation::Delete);
        let (key, task) = self
            .tasks
            .remove(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        self.check_entry(&key, &task);

        let decremented = self
            .len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if decremented.is_err() {
            self.report_fault("stored task count underflow");
        }

        self.metrics.record_deleted();
        info!(task_id = %id, status = %task.status, "Task deleted");
        Ok(())
    }

    /// Number of stored tasks. Never blocks on shard locks.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns true if no tasks are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored task count per status.
    pub fn status_counts(&self) -> [(TaskStatus, u64); 4] {
        let mut counts = TaskStatus::ALL.map(|status| (status, 0u64));
        for entry in self.tasks.iter() {
            if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == entry.value().status) {
                slot.1 += 1;
            }
        }
        counts
    }

    /// Reason for the first detected internal fault, if any.
    pub fn fault(&self) -> Option<&str> {
        self.fault.get().map(String::as_str)
    }

    /// Returns true once an internal fault has been detected.
    pub fn is_faulted(&self) -> bool {
        self.fault.get().is_some()
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    pub(crate) fn report_fault(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.fault.set(reason.clone()).is_ok() {
            error!(reason = %reason, "Task registry fault detected");
        }
    }

    fn check_entry(&self, key: &TaskId, task: &Task) {
        if *key != task.id {
            self.report_fault(format!("task stored under '{key}' has id '{}'", task.id));
        } else if task.updated_at < task.created_at {
            self.report_fault(format!("task '{key}' updated before it was created"));
        }
    }
}
