//! Ephemeral Task Service Server

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use ephemeral_server::logging::{self, LogFormat};
use ephemeral_server::{http, AppState, Config};

/// Stateless task service instance.
#[derive(Parser, Debug)]
#[command(name = "ephemeral-server", about = "Stateless in-memory task service", version)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP port
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Deployment environment name
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Withdraw readiness once this many tasks are stored
    #[arg(long, env = "MAX_TASKS")]
    max_tasks: Option<usize>,

    /// Simulated processing time per task in milliseconds (0 disables)
    #[arg(long, env = "PROCESS_DELAY_MS", default_value_t = 2000)]
    process_delay_ms: u64,

    /// Seconds to keep serving, not ready, after a shutdown signal
    #[arg(long, env = "DRAIN_GRACE_SECS", default_value_t = 5)]
    drain_grace_secs: u64,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            bind_addr: format!("{}:{}", self.host, self.port),
            environment: self.environment,
            log_format: self.log_format,
            max_tasks: self.max_tasks,
            process_delay: Duration::from_millis(self.process_delay_ms),
            drain_grace: Duration::from_secs(self.drain_grace_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config();

    // Initialize tracing
    logging::init(config.log_format).map_err(|e| e as Box<dyn std::error::Error>)?;

    let state = AppState::new(&config);
    let router = http::create_router(state.clone());

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        environment = %config.environment,
        max_tasks = ?config.max_tasks,
        process_delay = ?config.process_delay,
        "Starting ephemeral task service"
    );

    state.health.mark_ready();

    axum::serve(listener, router)
        .with_graceful_shutdown(drain(state.clone(), config.drain_grace))
        .await?;

    info!(tasks_discarded = state.task_count(), "Ephemeral task service stopped");
    Ok(())
}

/// Resolves once the instance has drained after a shutdown signal.
async fn drain(state: Arc<AppState>, grace: Duration) {
    shutdown_signal().await;

    state.health.begin_drain();
    info!(grace_secs = grace.as_secs(), "Draining before shutdown");
    tokio::time::sleep(grace).await;

    state.processor.shutdown();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
