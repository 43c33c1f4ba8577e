//! Podling Core - shared domain types and error taxonomy for the Podling
//! worker agent.
//!
//! This crate provides:
//! - Task and Pod domain types exchanged with the master
//! - Probe and restart-policy declarations
//! - Resource quantity parsing
//! - The base error type with miette diagnostics

pub mod error;
pub mod node;
pub mod pod;
pub mod probe;
pub mod resources;
pub mod restart;
pub mod task;

pub use error::{CoreError, Result};
pub use node::{NodeRegistered, NodeRegistration};
pub use pod::{
    ContainerStatus, Pod, PodContainer, PodStatus, PodStatusUpdate, PortMapping, Protocol,
    POD_IP_ANNOTATION,
};
pub use probe::{ProbeAction, ProbeSpec};
pub use resources::{ResourceQuantities, ResourceSpec};
pub use restart::{should_restart, RestartPolicy};
pub use task::{HealthStatus, Task, TaskStatus, TaskStatusUpdate};

/// Serialize a value to JSON, wrapping failures as a `CoreError`.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| {
        CoreError::serialization_error(format!("failed to serialize to JSON: {e}"), Some(Box::new(e)))
    })
}

/// Deserialize a value from JSON, wrapping failures as a `CoreError`.
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| {
        CoreError::serialization_error(format!("failed to deserialize from JSON: {e}"), Some(Box::new(e)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip() {
        let task = Task::new("t1", "demo", "alpine:latest");
        let json = to_json(&task).unwrap();
        let back: Task = from_json(&json).unwrap();
        assert_eq!(back.task_id, "t1");
    }
}
