use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use podling_core::{NodeRegistration, Pod, Task, TaskStatus, TaskStatusUpdate};
use podling_core::PodStatusUpdate;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_client::ApiClient;
use crate::error::{Result, RuntimeError};
use crate::probe::CheckerHandle;
use crate::sysinfo::detect_system_resources;
use crate::traits::RuntimeAdapter;

const HEARTBEAT_BASE_BACKOFF: Duration = Duration::from_secs(1);
const HEARTBEAT_MAX_BACKOFF: Duration = Duration::from_secs(30);
const HEARTBEAT_MAX_RETRIES: u32 = 5;
const HEARTBEAT_WARN_THRESHOLD: u32 = 10;
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Construction parameters mirroring the CLI flag surface.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub hostname: String,
    pub port: u16,
    pub master_url: String,
    pub heartbeat_interval: Duration,
    pub shutdown_timeout: Duration,
}

/// Live state for one in-flight task, owned by the agent's registry and
/// mutated in place by the task executor as it progresses.
pub struct TaskHandle {
    pub task: Mutex<Task>,
    pub cancel: CancellationToken,
}

/// Live state for one in-flight pod. Fields beyond `pod` are populated
/// incrementally by the pod executor (network first, then containers, then
/// checkers) so that shutdown's forced-cleanup path always has an accurate
/// picture of what exists regardless of which phase it interrupts.
pub struct PodHandle {
    pub pod: Mutex<Pod>,
    pub network_id: Mutex<Option<String>>,
    pub container_ids: Mutex<HashMap<String, String>>,
    pub checkers: Mutex<HashMap<String, CheckerHandle>>,
    pub cancel: CancellationToken,
}

/// Process-wide state owner: node identity, the runtime adapter, the
/// outbound client to the master, and the registries of everything this
/// worker currently has running.
pub struct Agent {
    config: AgentConfig,
    runtime: Arc<dyn RuntimeAdapter>,
    api_client: ApiClient,
    node_id: RwLock<Option<String>>,
    running_tasks: RwLock<HashMap<String, Arc<TaskHandle>>>,
    running_pods: RwLock<HashMap<String, Arc<PodHandle>>>,
    consecutive_heartbeat_failures: AtomicU32,
}

impl Agent {
    pub fn new(config: AgentConfig, runtime: Arc<dyn RuntimeAdapter>) -> Self {
        let api_client = ApiClient::new(config.master_url.clone());
        Self {
            config,
            runtime,
            api_client,
            node_id: RwLock::new(None),
            running_tasks: RwLock::new(HashMap::new()),
            running_pods: RwLock::new(HashMap::new()),
            consecutive_heartbeat_failures: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn runtime(&self) -> Arc<dyn RuntimeAdapter> {
        Arc::clone(&self.runtime)
    }

    pub async fn node_id(&self) -> Option<String> {
        self.node_id.read().await.clone()
    }

    /// Detects host CPU/memory and registers with the master, adopting the
    /// node id the master assigns.
    pub async fn register(&self) -> Result<String> {
        let resources = detect_system_resources()?;
        let registration = NodeRegistration {
            hostname: self.config.hostname.clone(),
            port: self.config.port,
            cpu_millicores: resources.cpu_count as i64 * 1000,
            memory_bytes: resources.total_memory_bytes as i64,
        };

        let registered = self.api_client.register(&registration).await?;
        info!(node_id = %registered.node_id, "registered with master");
        *self.node_id.write().await = Some(registered.node_id.clone());
        Ok(registered.node_id)
    }

    /// Runs until `token` is cancelled, sending one heartbeat per
    /// `heartbeat_interval`. A failing heartbeat is retried with exponential
    /// backoff (1s, 2s, 4s, 8s, 16s, capped at 30s) up to 5 attempts before
    /// the loop gives up on that tick and waits for the next one.
    pub async fn run_heartbeat_loop(&self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.heartbeat_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("heartbeat loop stopping");
                    return;
                }
                _ = interval.tick() => {}
            }

            let Some(node_id) = self.node_id().await else {
                warn!("heartbeat tick skipped: not yet registered");
                continue;
            };

            self.send_heartbeat_with_retry(&node_id, &token).await;
        }
    }

    async fn send_heartbeat_with_retry(&self, node_id: &str, token: &CancellationToken) {
        let mut backoff = HEARTBEAT_BASE_BACKOFF;
        for attempt in 0..HEARTBEAT_MAX_RETRIES {
            match self.api_client.heartbeat(node_id).await {
                Ok(()) => {
                    self.consecutive_heartbeat_failures.store(0, Ordering::SeqCst);
                    return;
                }
                Err(e) => {
                    let failures =
                        self.consecutive_heartbeat_failures.fetch_add(1, Ordering::SeqCst) + 1;
                    warn!(attempt, error = %e, failures, "heartbeat attempt failed");
                    if failures >= HEARTBEAT_WARN_THRESHOLD {
                        warn!(failures, "sustained heartbeat failures, master may be unreachable");
                    }
                    if attempt + 1 >= HEARTBEAT_MAX_RETRIES {
                        break;
                    }
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(HEARTBEAT_MAX_BACKOFF);
                }
            }
        }
    }

    // --- task registry ---------------------------------------------------

    pub async fn register_task_handle(&self, task: Task) -> Arc<TaskHandle> {
        let handle = Arc::new(TaskHandle {
            task: Mutex::new(task.clone()),
            cancel: CancellationToken::new(),
        });
        self.running_tasks
            .write()
            .await
            .insert(task.task_id.clone(), Arc::clone(&handle));
        handle
    }

    pub async fn get_task_handle(&self, task_id: &str) -> Option<Arc<TaskHandle>> {
        self.running_tasks.read().await.get(task_id).cloned()
    }

    pub async fn unregister_task(&self, task_id: &str) {
        self.running_tasks.write().await.remove(task_id);
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        let handle = self.get_task_handle(task_id).await?;
        Some(handle.task.lock().await.clone())
    }

    pub async fn get_task_logs(&self, task_id: &str, tail: Option<u32>) -> Result<String> {
        let handle = self
            .get_task_handle(task_id)
            .await
            .ok_or_else(|| RuntimeError::task_not_found(task_id))?;
        let container_id = handle.task.lock().await.container_id.clone();
        let container_id = container_id.ok_or_else(|| RuntimeError::task_not_found(task_id))?;
        self.runtime.container_logs(&container_id, tail).await
    }

    pub async fn report_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        container_id: Option<String>,
        error: Option<String>,
    ) {
        let update = TaskStatusUpdate {
            status,
            container_id,
            error,
        };
        if let Err(e) = self.api_client.update_task_status(task_id, &update).await {
            warn!(task_id, error = %e, "failed to report task status to master");
        }
    }

    // --- pod registry ------------------------------------------------------

    pub async fn register_pod_handle(&self, pod: Pod) -> Arc<PodHandle> {
        let handle = Arc::new(PodHandle {
            pod: Mutex::new(pod.clone()),
            network_id: Mutex::new(None),
            container_ids: Mutex::new(HashMap::new()),
            checkers: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        });
        self.running_pods
            .write()
            .await
            .insert(pod.pod_id.clone(), Arc::clone(&handle));
        handle
    }

    pub async fn get_pod_handle(&self, pod_id: &str) -> Option<Arc<PodHandle>> {
        self.running_pods.read().await.get(pod_id).cloned()
    }

    pub async fn unregister_pod(&self, pod_id: &str) {
        self.running_pods.write().await.remove(pod_id);
    }

    pub async fn get_pod(&self, pod_id: &str) -> Option<Pod> {
        let handle = self.get_pod_handle(pod_id).await?;
        Some(handle.pod.lock().await.clone())
    }

    pub async fn report_pod_status(&self, pod_id: &str, update: PodStatusUpdate) {
        if let Err(e) = self.api_client.update_pod_status(pod_id, &update).await {
            warn!(pod_id, error = %e, "failed to report pod status to master");
        }
    }

    // --- shutdown ------------------------------------------------------

    /// Drains whatever is currently running. Polls both registries every
    /// 500ms; if `deadline` elapses first, forcibly stops and removes every
    /// container still tracked before giving up on a graceful drain. Always
    /// attempts a best-effort deregister afterward.
    pub async fn shutdown(&self, deadline: Duration) {
        let start = tokio::time::Instant::now();
        loop {
            let tasks_empty = self.running_tasks.read().await.is_empty();
            let pods_empty = self.running_pods.read().await.is_empty();
            if tasks_empty && pods_empty {
                info!("all workloads drained, shutting down cleanly");
                break;
            }
            if start.elapsed() >= deadline {
                warn!("shutdown deadline exceeded, forcing cleanup of remaining workloads");
                self.force_cleanup().await;
                break;
            }
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }

        if let Some(node_id) = self.node_id().await {
            if let Err(e) = self.api_client.deregister(&node_id).await {
                warn!(node_id, error = %e, "best-effort deregister failed");
            }
        }
    }

    async fn force_cleanup(&self) {
        let tasks: Vec<_> = self.running_tasks.write().await.drain().collect();
        for (task_id, handle) in tasks {
            handle.cancel.cancel();
            let container_id = handle.task.lock().await.container_id.clone();
            if let Some(container_id) = container_id {
                let _ = self
                    .runtime
                    .stop_container(&container_id, Duration::from_secs(5))
                    .await;
                let _ = self.runtime.remove_container(&container_id, true).await;
            }
            debug!(task_id, "force-cleaned task");
        }

        let pods: Vec<_> = self.running_pods.write().await.drain().collect();
        for (pod_id, handle) in pods {
            handle.cancel.cancel();
            for checker in handle.checkers.lock().await.values() {
                checker.stop();
            }
            let container_ids: Vec<String> =
                handle.container_ids.lock().await.values().cloned().collect();
            for container_id in container_ids {
                let _ = self
                    .runtime
                    .stop_container(&container_id, Duration::from_secs(5))
                    .await;
                let _ = self.runtime.remove_container(&container_id, true).await;
            }
            if let Some(network_id) = handle.network_id.lock().await.clone() {
                let _ = self.runtime.remove_pod_network(&network_id).await;
            }
            debug!(pod_id, "force-cleaned pod");
        }
    }

    // --- workload dispatch ------------------------------------------------

    /// Registers the task and spawns its executor on a detached task.
    /// Returns as soon as the handle is registered, not when execution
    /// finishes.
    pub async fn execute_task(self: &Arc<Self>, task: Task) {
        let task_id = task.task_id.clone();
        self.register_task_handle(task).await;
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            crate::executor::task::run_task(agent, task_id).await;
        });
    }

    /// Registers the pod and spawns its executor on a detached task.
    pub async fn execute_pod(self: &Arc<Self>, pod: Pod) {
        let pod_id = pod.pod_id.clone();
        self.register_pod_handle(pod).await;
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            crate::executor::pod::run_pod(agent, pod_id).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;
    use crate::types::ContainerSpec;

    fn test_config() -> AgentConfig {
        AgentConfig {
            hostname: "worker-test".to_string(),
            port: 7070,
            master_url: "http://127.0.0.1:1".to_string(),
            heartbeat_interval: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup_task_handle() {
        let agent = Agent::new(test_config(), Arc::new(MockRuntime::new()));
        let task = Task::new("t1", "demo", "alpine:latest");
        agent.register_task_handle(task).await;

        assert!(agent.get_task("t1").await.is_some());
        agent.unregister_task("t1").await;
        assert!(agent.get_task("t1").await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_with_empty_registries_returns_immediately() {
        let agent = Agent::new(test_config(), Arc::new(MockRuntime::new()));
        let start = tokio::time::Instant::now();
        agent.shutdown(Duration::from_secs(5)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_shutdown_deadline_forces_container_cleanup() {
        let runtime = Arc::new(MockRuntime::new());
        let container_id = runtime
            .create_container(ContainerSpec::new("c1", "alpine:latest"))
            .await
            .unwrap();
        runtime.start_container(&container_id).await.unwrap();

        let agent = Agent::new(test_config(), Arc::clone(&runtime) as Arc<dyn RuntimeAdapter>);
        let mut task = Task::new("t1", "demo", "alpine:latest");
        task.container_id = Some(container_id.clone());
        agent.register_task_handle(task).await;

        agent.shutdown(Duration::from_millis(10)).await;

        assert!(agent.get_task("t1").await.is_none());
        assert!(runtime.wait_container(&container_id).await.is_err());
    }

    #[tokio::test]
    async fn test_get_task_logs_without_container_id_fails() {
        let agent = Agent::new(test_config(), Arc::new(MockRuntime::new()));
        agent.register_task_handle(Task::new("t1", "demo", "alpine:latest")).await;
        assert!(agent.get_task_logs("t1", None).await.is_err());
    }
}
