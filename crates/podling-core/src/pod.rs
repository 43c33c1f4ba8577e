use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::probe::ProbeSpec;
use crate::resources::ResourceSpec;
use crate::restart::RestartPolicy;
use crate::task::HealthStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PodStatus {
    Pending,
    Scheduled,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PodStatus::Succeeded | PodStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Waiting,
    Running,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    #[serde(default)]
    pub host_port: Option<u16>,
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
}

fn default_protocol() -> Protocol {
    Protocol::Tcp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// One container within a pod spec as declared by the master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodContainer {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub liveness_probe: Option<ProbeSpec>,
    #[serde(default)]
    pub readiness_probe: Option<ProbeSpec>,
    #[serde(default)]
    pub resources: ResourceSpec,

    // Worker-populated observed state.
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default = "default_container_status")]
    pub status: ContainerStatus,
    #[serde(default)]
    pub health_status: HealthStatus,
    #[serde(default)]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub exit_code: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_container_status() -> ContainerStatus {
    ContainerStatus::Waiting
}

impl PodContainer {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            env: BTreeMap::new(),
            ports: Vec::new(),
            liveness_probe: None,
            readiness_probe: None,
            resources: ResourceSpec::default(),
            container_id: None,
            status: ContainerStatus::Waiting,
            health_status: HealthStatus::Unknown,
            started_at: None,
            finished_at: None,
            exit_code: None,
            error: None,
        }
    }
}

/// A multi-container workload sharing one pod network, dispatched by the
/// master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub pod_id: String,
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<PodContainer>,
    pub status: PodStatus,
    pub node_id: String,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default)]
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Pod {
    pub fn new(pod_id: impl Into<String>, name: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            pod_id: pod_id.into(),
            name: name.into(),
            namespace: default_namespace(),
            labels: BTreeMap::new(),
            containers: Vec::new(),
            status: PodStatus::Pending,
            node_id: node_id.into(),
            restart_policy: RestartPolicy::Never,
            scheduled_at: None,
            started_at: None,
            finished_at: None,
            message: None,
            reason: None,
            annotations: BTreeMap::new(),
        }
    }
}

/// Status snapshot of a pod as reported to the master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodStatusUpdate {
    pub status: PodStatus,
    #[serde(default)]
    pub containers: Option<Vec<PodContainer>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// Annotation key the worker attaches once it has discovered the pod's
/// shared network IP.
pub const POD_IP_ANNOTATION: &str = "podling.io/pod-ip";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_defaults_to_pending() {
        let pod = Pod::new("p1", "demo", "node-1");
        assert_eq!(pod.status, PodStatus::Pending);
        assert_eq!(pod.namespace, "default");
    }

    #[test]
    fn test_pod_container_new_is_waiting() {
        let c = PodContainer::new("web", "nginx:latest");
        assert_eq!(c.status, ContainerStatus::Waiting);
        assert!(c.container_id.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(PodStatus::Succeeded.is_terminal());
        assert!(PodStatus::Failed.is_terminal());
        assert!(!PodStatus::Running.is_terminal());
    }
}
