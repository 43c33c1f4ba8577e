use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ContainerSpec;

/// Narrow capability surface onto the host container runtime.
///
/// This trait abstracts over the Docker Engine API. It enables testing via
/// `MockRuntime` without a running daemon. Every operation is a single
/// runtime call; timeout and cancellation are the caller's responsibility
/// (executors wrap calls with their own deadline).
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    /// Pull an image, draining the pull stream before returning. Idempotent.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Create a container from `spec`. Always labels it `managed=true`.
    /// Returns the runtime-assigned container id.
    async fn create_container(&self, spec: ContainerSpec) -> Result<String>;

    async fn start_container(&self, container_id: &str) -> Result<()>;

    /// Stop a running container, giving it `grace` to exit before a kill.
    async fn stop_container(&self, container_id: &str, grace: Duration) -> Result<()>;

    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()>;

    /// Block until the container leaves the running state. Returns its
    /// exit code.
    async fn wait_container(&self, container_id: &str) -> Result<i64>;

    async fn container_logs(&self, container_id: &str, tail: Option<u32>) -> Result<String>;

    /// Run a command inside a running container. Returns exit code plus
    /// combined stdout/stderr.
    async fn exec_in_container(&self, container_id: &str, argv: &[String]) -> Result<(i64, String)>;

    /// Create a bridge network scoped to one pod, labeled
    /// `{pod-id: <pod_id>, type: pod-network}`. Returns the network id.
    async fn create_pod_network(&self, pod_id: &str) -> Result<String>;

    async fn remove_pod_network(&self, network_id: &str) -> Result<()>;

    /// Resolve a container's address on a given pod network.
    async fn container_ip(&self, container_id: &str, network_id: &str) -> Result<IpAddr>;
}
