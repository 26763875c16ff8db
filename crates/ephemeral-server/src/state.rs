//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::health::HealthMonitor;
use crate::metrics::HttpMetrics;
use crate::processor::TaskProcessor;
use crate::registry::TaskRegistry;

/// Everything a request handler can reach. Built once per process.
pub struct AppState {
    /// The task store for this instance.
    pub registry: Arc<TaskRegistry>,

    /// Liveness/readiness predicates.
    pub health: HealthMonitor,

    /// Background processing of accepted tasks.
    pub processor: TaskProcessor,

    /// Per-request HTTP counters.
    pub http_metrics: HttpMetrics,

    /// Deployment environment name.
    pub environment: String,
}

impl AppState {
    /// Create a new AppState wrapped in Arc, with an empty registry.
    pub fn new(config: &Config) -> Arc<Self> {
        let registry = Arc::new(TaskRegistry::new());
        Arc::new(Self {
            health: HealthMonitor::new(registry.clone(), config.max_tasks),
            processor: TaskProcessor::new(registry.clone(), config.process_delay),
            http_metrics: HttpMetrics::new(),
            environment: config.environment.clone(),
            registry,
        })
    }

    /// Get the number of stored tasks.
    pub fn task_count(&self) -> usize {
        self.registry.len()
    }
}
