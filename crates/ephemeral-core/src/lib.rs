//! Ephemeral Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Storage
//! - Runtime specifics
//!
//! All types here represent the task lifecycle of a single service instance.

pub mod error;
pub mod ids;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::TaskId;
pub use status::TaskStatus;
pub use task::{Task, TaskResult};
