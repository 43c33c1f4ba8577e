use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use podling_core::{
    ContainerStatus, HealthStatus, Pod, PodStatus, PodStatusUpdate, POD_IP_ANNOTATION,
};
use tracing::{info, warn};

use crate::agent::{Agent, PodHandle};
use crate::executor::{build_probe, WORKLOAD_DEADLINE};
use crate::probe::{spawn_checker, CheckerParams, OnUnhealthy};
use crate::types::ContainerSpec;

const STOP_GRACE: Duration = Duration::from_secs(10);

/// Drives one pod through its full lifecycle: create a shared bridge
/// network, pull every container image, create and start containers
/// sequentially (so a later container can depend on an earlier one having
/// claimed its network slot), start liveness checkers, discover the pod's
/// network address, wait for every container in parallel, stop the
/// checkers, clean up best-effort, then report the final status. Always
/// unregisters itself from the agent's registry on the way out.
pub async fn run_pod(agent: Arc<Agent>, pod_id: String) {
    let outcome = tokio::time::timeout(WORKLOAD_DEADLINE, run_pod_inner(&agent, &pod_id)).await;
    if outcome.is_err() {
        warn!(pod_id, "pod executor exceeded its workload deadline");
    }
    agent.unregister_pod(&pod_id).await;
}

async fn run_pod_inner(agent: &Arc<Agent>, pod_id: &str) {
    let Some(handle) = agent.get_pod_handle(pod_id).await else {
        warn!(pod_id, "pod handle missing at executor start");
        return;
    };

    // Phase 1: track. Report the pod as running before anything is created;
    // the container list is still the bare declared spec at this point, so
    // it is omitted rather than reported as if it were observed state.
    update_pod_status(&handle, PodStatus::Running, None, None).await;
    report_pod_tracking_only(agent, pod_id, &handle).await;

    let containers = { handle.pod.lock().await.containers.clone() };

    // Phase 2: network.
    let network_id = match agent.runtime().create_pod_network(pod_id).await {
        Ok(id) => id,
        Err(e) => {
            let msg = format!("pod network create failed: {e}");
            warn!(pod_id, error = %msg, "pod failed during network create");
            fail_pod(agent, pod_id, &handle, msg, "NetworkCreateError").await;
            return;
        }
    };
    *handle.network_id.lock().await = Some(network_id.clone());

    // Phase 3: pull every image before creating any container.
    for c in &containers {
        if let Err(e) = agent.runtime().pull_image(&c.image).await {
            let msg = format!("image pull failed for container '{}': {e}", c.name);
            warn!(pod_id, container = %c.name, error = %msg, "pod failed during image pull");
            fail_pod(agent, pod_id, &handle, msg, "ImagePullError").await;
            cleanup(agent, &handle).await;
            return;
        }
    }

    // Phase 4: create and start containers sequentially.
    for c in &containers {
        let mut spec = ContainerSpec::new(format!("podling-pod-{pod_id}-{}", c.name), c.image.clone());
        spec.env = c.env.clone();
        spec.limits = c.resources.limits;
        spec.network_id = Some(network_id.clone());

        let container_id = match agent.runtime().create_container(spec).await {
            Ok(id) => id,
            Err(e) => {
                let msg = format!("container create failed for '{}': {e}", c.name);
                warn!(pod_id, container = %c.name, error = %msg, "pod failed during container create");
                fail_pod(agent, pod_id, &handle, msg, "ContainerCreateError").await;
                cleanup(agent, &handle).await;
                return;
            }
        };
        handle
            .container_ids
            .lock()
            .await
            .insert(c.name.clone(), container_id.clone());

        if let Err(e) = agent.runtime().start_container(&container_id).await {
            let msg = format!("container start failed for '{}': {e}", c.name);
            warn!(pod_id, container = %c.name, error = %msg, "pod failed during container start");
            fail_pod(agent, pod_id, &handle, msg, "ContainerStartError").await;
            cleanup(agent, &handle).await;
            return;
        }

        let mut pod = handle.pod.lock().await;
        if let Some(pc) = pod.containers.iter_mut().find(|pc| pc.name == c.name) {
            pc.container_id = Some(container_id);
            pc.status = ContainerStatus::Running;
            pc.started_at = Some(Utc::now());
        }
    }

    // Phase 5: start liveness checkers.
    for c in &containers {
        let Some(probe_spec) = &c.liveness_probe else {
            continue;
        };
        let container_id = handle.container_ids.lock().await.get(&c.name).cloned();
        let Some(container_id) = container_id else {
            continue;
        };
        match build_probe(agent.runtime(), &container_id, &network_id, probe_spec).await {
            Ok(probe) => {
                let on_unhealthy = container_unhealthy_callback(
                    Arc::clone(agent),
                    pod_id.to_string(),
                    c.name.clone(),
                );
                let checker = spawn_checker(probe, CheckerParams::from(probe_spec), on_unhealthy);
                handle.checkers.lock().await.insert(c.name.clone(), checker);
            }
            Err(e) => {
                warn!(pod_id, container = %c.name, error = %e, "failed to construct liveness probe, running without one");
            }
        }
    }

    // Phase 6: discover the pod's shared network address via its first
    // container and annotate it.
    if let Some(first) = containers.first() {
        if let Some(container_id) = handle.container_ids.lock().await.get(&first.name).cloned() {
            match agent.runtime().container_ip(&container_id, &network_id).await {
                Ok(ip) => {
                    handle
                        .pod
                        .lock()
                        .await
                        .annotations
                        .insert(POD_IP_ANNOTATION.to_string(), ip.to_string());
                }
                Err(e) => {
                    warn!(pod_id, error = %e, "failed to discover pod network address");
                }
            }
        }
    }
    report_pod(agent, pod_id, &handle).await;

    // Phase 7: wait for every container in parallel.
    let container_ids: Vec<(String, String)> = handle
        .container_ids
        .lock()
        .await
        .iter()
        .map(|(name, id)| (name.clone(), id.clone()))
        .collect();

    let waits = container_ids.iter().map(|(name, id)| {
        let runtime = agent.runtime();
        let name = name.clone();
        let id = id.clone();
        async move {
            let result = runtime.wait_container(&id).await;
            (name, result)
        }
    });
    let results = join_all(waits).await;

    // Phase 8: stop probes.
    for checker in handle.checkers.lock().await.values() {
        checker.stop();
    }

    // Phase 9: best-effort cleanup.
    cleanup(agent, &handle).await;

    // Phase 10: finalize.
    let mut any_failed = false;
    {
        let mut pod = handle.pod.lock().await;
        for (name, result) in &results {
            let exit_code = match result {
                Ok(code) => *code,
                Err(e) => {
                    warn!(pod_id, container = %name, error = %e, "failed to read container exit status");
                    any_failed = true;
                    continue;
                }
            };
            if exit_code != 0 {
                any_failed = true;
            }
            if let Some(pc) = pod.containers.iter_mut().find(|pc| &pc.name == name) {
                pc.status = ContainerStatus::Terminated;
                pc.exit_code = Some(exit_code);
                pc.finished_at = Some(Utc::now());
            }
        }
        if any_failed {
            let failed_count = pod
                .containers
                .iter()
                .filter(|pc| pc.exit_code.map(|c| c != 0).unwrap_or(true))
                .count();
            pod.status = PodStatus::Failed;
            pod.message = Some(format!("{failed_count} container(s) failed"));
            pod.reason = Some("ContainerError".to_string());
        } else {
            pod.status = PodStatus::Succeeded;
            pod.message = Some("All containers completed successfully".to_string());
            pod.reason = Some("Completed".to_string());
        }
        pod.finished_at = Some(Utc::now());
    }

    info!(pod_id, failed = any_failed, "pod execution finished");
    report_pod(agent, pod_id, &handle).await;
}

async fn cleanup(agent: &Arc<Agent>, handle: &Arc<PodHandle>) {
    let container_ids: Vec<String> = handle.container_ids.lock().await.values().cloned().collect();
    for container_id in container_ids {
        if let Err(e) = agent
            .runtime()
            .stop_container(&container_id, STOP_GRACE)
            .await
        {
            warn!(container_id, error = %e, "best-effort stop failed during cleanup");
        }
        if let Err(e) = agent.runtime().remove_container(&container_id, true).await {
            warn!(container_id, error = %e, "best-effort remove failed during cleanup");
        }
    }

    if let Some(network_id) = handle.network_id.lock().await.take() {
        if let Err(e) = agent.runtime().remove_pod_network(&network_id).await {
            warn!(network_id, error = %e, "best-effort network remove failed during cleanup");
        }
    }
}

async fn update_pod_status(handle: &Arc<PodHandle>, status: PodStatus, message: Option<String>, reason: Option<String>) {
    let mut pod = handle.pod.lock().await;
    pod.status = status;
    if message.is_some() {
        pod.message = message;
    }
    if reason.is_some() {
        pod.reason = reason;
    }
}

async fn fail_pod(
    agent: &Arc<Agent>,
    pod_id: &str,
    handle: &Arc<PodHandle>,
    message: String,
    reason: &str,
) {
    update_pod_status(handle, PodStatus::Failed, Some(message), Some(reason.to_string())).await;
    report_pod(agent, pod_id, handle).await;
}

/// Reports the pod's current status including its per-container slice.
async fn report_pod(agent: &Arc<Agent>, pod_id: &str, handle: &Arc<PodHandle>) {
    report_pod_impl(agent, pod_id, handle, true).await;
}

/// Reports the pod's current status without the per-container slice, for
/// the Phase-1 "track" report sent before any container exists.
async fn report_pod_tracking_only(agent: &Arc<Agent>, pod_id: &str, handle: &Arc<PodHandle>) {
    report_pod_impl(agent, pod_id, handle, false).await;
}

async fn report_pod_impl(
    agent: &Arc<Agent>,
    pod_id: &str,
    handle: &Arc<PodHandle>,
    include_containers: bool,
) {
    let pod: Pod = handle.pod.lock().await.clone();
    let update = PodStatusUpdate {
        status: pod.status,
        containers: if include_containers { Some(pod.containers) } else { None },
        message: pod.message,
        reason: pod.reason,
        annotations: Some(pod.annotations),
    };
    agent.report_pod_status(pod_id, update).await;
}

fn container_unhealthy_callback(agent: Arc<Agent>, pod_id: String, container_name: String) -> OnUnhealthy {
    Arc::new(move || {
        let agent = Arc::clone(&agent);
        let pod_id = pod_id.clone();
        let container_name = container_name.clone();
        Box::pin(async move {
            warn!(pod_id, container = %container_name, "pod container failed its liveness check");
            if let Some(handle) = agent.get_pod_handle(&pod_id).await {
                let mut pod = handle.pod.lock().await;
                if let Some(pc) = pod.containers.iter_mut().find(|pc| pc.name == container_name) {
                    pc.health_status = HealthStatus::Unhealthy;
                }
                pod.message = Some(format!("Container {container_name} is unhealthy"));
                pod.reason = Some("Unhealthy".to_string());
                drop(pod);
                report_pod(&agent, &pod_id, &handle).await;
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::mock::MockRuntime;
    use podling_core::PodContainer;

    fn make_agent(runtime: Arc<MockRuntime>) -> Arc<Agent> {
        Arc::new(Agent::new(
            AgentConfig {
                hostname: "worker-test".to_string(),
                port: 7070,
                master_url: "http://127.0.0.1:1".to_string(),
                heartbeat_interval: Duration::from_secs(10),
                shutdown_timeout: Duration::from_secs(30),
            },
            runtime,
        ))
    }

    #[tokio::test]
    async fn test_happy_pod_reaches_succeeded() {
        let runtime = Arc::new(MockRuntime::new());
        let agent = make_agent(Arc::clone(&runtime));

        let mut pod = Pod::new("p1", "demo", "node-1");
        pod.containers.push(PodContainer::new("web", "nginx:latest"));
        pod.containers.push(PodContainer::new("sidecar", "alpine:latest"));
        agent.register_pod_handle(pod).await;

        run_pod(Arc::clone(&agent), "p1".to_string()).await;

        assert!(agent.get_pod("p1").await.is_none());
        assert_eq!(runtime.pulled_images().await.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_handle_returns_without_panicking() {
        let runtime = Arc::new(MockRuntime::new());
        let agent = make_agent(runtime);
        run_pod(agent, "nonexistent".to_string()).await;
    }

    #[tokio::test]
    async fn test_pod_with_no_containers_still_finalizes() {
        let runtime = Arc::new(MockRuntime::new());
        let agent = make_agent(Arc::clone(&runtime));

        let pod = Pod::new("p2", "empty", "node-1");
        agent.register_pod_handle(pod).await;

        run_pod(Arc::clone(&agent), "p2".to_string()).await;
        assert!(agent.get_pod("p2").await.is_none());
    }
}
