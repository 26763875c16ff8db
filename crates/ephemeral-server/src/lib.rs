//! Ephemeral Task Service Library
//!
//! This crate provides the in-memory task registry, health monitoring,
//! metrics and the HTTP facade of one disposable service instance.

pub mod config;
pub mod health;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod registry;
pub mod state;

pub use config::Config;
pub use health::HealthMonitor;
pub use registry::TaskRegistry;
pub use state::AppState;
