use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::probe::ProbeSpec;
use crate::resources::ResourceSpec;
use crate::restart::RestartPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// A single-container workload dispatched by the master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub liveness_probe: Option<ProbeSpec>,
    #[serde(default)]
    pub readiness_probe: Option<ProbeSpec>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default)]
    pub resources: ResourceSpec,
    #[serde(default)]
    pub health_status: HealthStatus,
}

impl Task {
    pub fn new(task_id: impl Into<String>, name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            name: name.into(),
            image: image.into(),
            env: BTreeMap::new(),
            status: TaskStatus::Pending,
            container_id: None,
            error: None,
            liveness_probe: None,
            readiness_probe: None,
            restart_policy: RestartPolicy::Never,
            resources: ResourceSpec::default(),
            health_status: HealthStatus::Unknown,
        }
    }
}

/// Status snapshot of a task as reported to the master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub status: TaskStatus,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_new_task_defaults() {
        let t = Task::new("t1", "demo", "alpine:latest");
        assert_eq!(t.status, TaskStatus::Pending);
        assert!(t.container_id.is_none());
        assert_eq!(t.restart_policy, RestartPolicy::Never);
    }
}
