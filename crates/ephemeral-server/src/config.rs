//! Service configuration.

use std::time::Duration;

use crate::logging::LogFormat;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Deployment environment name, reported by `/health`.
    pub environment: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Stored task count at which readiness is withdrawn.
    pub max_tasks: Option<usize>,

    /// Simulated processing time for accepted tasks. Zero disables processing.
    pub process_delay: Duration,

    /// Time to stay up, not ready, after a shutdown signal.
    pub drain_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Text,
            max_tasks: None,
            process_delay: Duration::ZERO,
            drain_grace: Duration::from_secs(5),
        }
    }
}
