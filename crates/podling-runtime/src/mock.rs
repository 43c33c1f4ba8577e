use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::traits::RuntimeAdapter;
use crate::types::ContainerSpec;

#[derive(Debug, Clone)]
struct MockContainer {
    #[allow(dead_code)]
    spec_name: String,
    running: bool,
    /// Exit code the container will report once `wait_container` is called.
    /// Defaults to 0; tests can override via `MockRuntime::set_exit_code`.
    exit_code: i64,
}

/// In-memory runtime for testing and for development without a Docker
/// daemon. Maintains in-memory container/network registries and simulates
/// state transitions; never shells out.
pub struct MockRuntime {
    containers: Arc<RwLock<HashMap<String, MockContainer>>>,
    networks: Arc<RwLock<HashMap<String, String>>>,
    next_id: AtomicU32,
    pulled_images: Arc<RwLock<Vec<String>>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            containers: Arc::new(RwLock::new(HashMap::new())),
            networks: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU32::new(1),
            pulled_images: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}-{n}")
    }

    /// Test hook: force the exit code `wait_container` will return.
    pub async fn set_exit_code(&self, container_id: &str, code: i64) {
        if let Some(c) = self.containers.write().await.get_mut(container_id) {
            c.exit_code = code;
        }
    }

    pub async fn pulled_images(&self) -> Vec<String> {
        self.pulled_images.read().await.clone()
    }
}

#[async_trait]
impl RuntimeAdapter for MockRuntime {
    async fn pull_image(&self, image: &str) -> Result<()> {
        self.pulled_images.write().await.push(image.to_string());
        debug!(image, "mock: image pulled");
        Ok(())
    }

    async fn create_container(&self, spec: ContainerSpec) -> Result<String> {
        let id = self.next_id("container");
        self.containers.write().await.insert(
            id.clone(),
            MockContainer {
                spec_name: spec.name,
                running: false,
                exit_code: 0,
            },
        );
        debug!(container_id = %id, "mock: container created");
        Ok(id)
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container_id)
            .ok_or_else(|| RuntimeError::container_not_found(container_id))?;
        c.running = true;
        Ok(())
    }

    async fn stop_container(&self, container_id: &str, _grace: Duration) -> Result<()> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container_id)
            .ok_or_else(|| RuntimeError::container_not_found(container_id))?;
        c.running = false;
        Ok(())
    }

    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()> {
        let mut containers = self.containers.write().await;
        if containers.remove(container_id).is_none() && !force {
            return Err(RuntimeError::container_not_found(container_id));
        }
        Ok(())
    }

    async fn wait_container(&self, container_id: &str) -> Result<i64> {
        let containers = self.containers.read().await;
        let c = containers
            .get(container_id)
            .ok_or_else(|| RuntimeError::container_not_found(container_id))?;
        Ok(c.exit_code)
    }

    async fn container_logs(&self, container_id: &str, _tail: Option<u32>) -> Result<String> {
        let containers = self.containers.read().await;
        containers
            .get(container_id)
            .ok_or_else(|| RuntimeError::container_not_found(container_id))?;
        Ok(String::new())
    }

    async fn exec_in_container(&self, container_id: &str, argv: &[String]) -> Result<(i64, String)> {
        let containers = self.containers.read().await;
        containers
            .get(container_id)
            .ok_or_else(|| RuntimeError::container_not_found(container_id))?;
        if argv.is_empty() {
            return Err(RuntimeError::exec_failed(container_id, "empty argv"));
        }
        Ok((0, String::new()))
    }

    async fn create_pod_network(&self, pod_id: &str) -> Result<String> {
        let id = self.next_id("network");
        self.networks.write().await.insert(id.clone(), pod_id.to_string());
        Ok(id)
    }

    async fn remove_pod_network(&self, network_id: &str) -> Result<()> {
        self.networks.write().await.remove(network_id);
        Ok(())
    }

    async fn container_ip(&self, _container_id: &str, _network_id: &str) -> Result<IpAddr> {
        Ok(IpAddr::V4(Ipv4Addr::new(172, 31, 0, 2)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_start_container() {
        let rt = MockRuntime::new();
        let id = rt
            .create_container(ContainerSpec::new("web", "nginx:latest"))
            .await
            .unwrap();
        rt.start_container(&id).await.unwrap();
        rt.stop_container(&id, Duration::from_secs(1)).await.unwrap();
        rt.remove_container(&id, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_operations_on_missing_container_fail() {
        let rt = MockRuntime::new();
        assert!(matches!(
            rt.start_container("missing").await.unwrap_err(),
            RuntimeError::ContainerNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_wait_container_returns_configured_exit_code() {
        let rt = MockRuntime::new();
        let id = rt
            .create_container(ContainerSpec::new("web", "nginx:latest"))
            .await
            .unwrap();
        rt.set_exit_code(&id, 2).await;
        assert_eq!(rt.wait_container(&id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_pod_network_lifecycle() {
        let rt = MockRuntime::new();
        let net_id = rt.create_pod_network("pod-1").await.unwrap();
        rt.remove_pod_network(&net_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_pull_image_tracks_history() {
        let rt = MockRuntime::new();
        rt.pull_image("alpine:latest").await.unwrap();
        assert_eq!(rt.pulled_images().await, vec!["alpine:latest".to_string()]);
    }
}
