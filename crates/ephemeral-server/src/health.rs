//! Liveness and readiness derived from registry state.
//!
//! Both predicates read atomics only, so a probe never waits behind an
//! in-flight registry mutation.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::registry::TaskRegistry;

/// Instance lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    /// Wiring up; not yet serving traffic.
    Starting = 0,
    /// Serving traffic.
    Ready = 1,
    /// Shutdown requested; finishing in-flight work.
    Draining = 2,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Ready,
            _ => Self::Draining,
        }
    }
}

/// Point-in-time health snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub phase: Phase,
    pub live: bool,
    pub ready: bool,
    pub task_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tasks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    pub uptime_seconds: u64,
}

/// Answers orchestrator probes without mutating the registry.
#[derive(Debug)]
pub struct HealthMonitor {
    registry: Arc<TaskRegistry>,
    phase: AtomicU8,
    max_tasks: Option<usize>,
    started_at: Instant,
}

impl HealthMonitor {
    /// Create a monitor in the `Starting` phase.
    ///
    /// With `max_tasks` set, the instance reports not-ready while it stores
    /// that many tasks or more.
    pub fn new(registry: Arc<TaskRegistry>, max_tasks: Option<usize>) -> Self {
        Self {
            registry,
            phase: AtomicU8::new(Phase::Starting as u8),
            max_tasks,
            started_at: Instant::now(),
        }
    }

    /// True unless the registry has flagged an unrecoverable fault.
    pub fn is_live(&self) -> bool {
        !self.registry.is_faulted()
    }

    /// True iff the instance should currently receive traffic.
    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready && self.is_live() && !self.is_over_capacity()
    }

    /// True if a task limit is configured and has been reached.
    pub fn is_over_capacity(&self) -> bool {
        self.max_tasks
            .is_some_and(|max| self.registry.len() >= max)
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Leave `Starting`. Has no effect once draining has begun.
    pub fn mark_ready(&self) {
        if self
            .phase
            .compare_exchange(
                Phase::Starting as u8,
                Phase::Ready as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            info!("Instance ready to receive traffic");
        }
    }

    /// Enter the shutdown drain window. Readiness stays false from here on.
    pub fn begin_drain(&self) {
        let previous = self.phase.swap(Phase::Draining as u8, Ordering::AcqRel);
        if previous != Phase::Draining as u8 {
            info!("Instance draining, readiness withdrawn");
        }
    }

    pub fn report(&self) -> HealthReport {
        HealthReport {
            phase: self.phase(),
            live: self.is_live(),
            ready: self.is_ready(),
            task_count: self.registry.len(),
            max_tasks: self.max_tasks,
            fault: self.registry.fault().map(str::to_string),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephemeral_core::TaskId;
    use serde_json::json;

    fn monitor(max_tasks: Option<usize>) -> (Arc<TaskRegistry>, HealthMonitor) {
        let registry = Arc::new(TaskRegistry::new());
        let health = HealthMonitor::new(registry.clone(), max_tasks);
        (registry, health)
    }

    #[test]
    fn test_not_ready_while_starting() {
        let (_, health) = monitor(None);
        assert!(health.is_live());
        assert!(!health.is_ready());
        assert_eq!(health.phase(), Phase::Starting);
    }

    #[test]
    fn test_ready_after_startup_and_not_during_drain() {
        let (_, health) = monitor(None);
        health.mark_ready();
        assert!(health.is_ready());

        health.begin_drain();
        assert!(!health.is_ready());
        assert!(health.is_live());

        health.mark_ready();
        assert_eq!(health.phase(), Phase::Draining);
    }

    #[test]
    fn test_fault_flips_liveness_and_readiness() {
        let (registry, health) = monitor(None);
        health.mark_ready();
        registry.report_fault("corrupted");

        assert!(!health.is_live());
        assert!(!health.is_ready());
        assert_eq!(health.report().fault.as_deref(), Some("corrupted"));
    }

    #[test]
    fn test_capacity_limit_withdraws_readiness() {
        let (registry, health) = monitor(Some(2));
        health.mark_ready();
        registry.create("a", json!({}), 1).unwrap();
        assert!(health.is_ready());

        registry.create("b", json!({}), 1).unwrap();
        assert!(health.is_over_capacity());
        assert!(!health.is_ready());
        assert!(health.is_live());

        registry.delete(&TaskId::new("a")).unwrap();
        assert!(health.is_ready());
    }
}
