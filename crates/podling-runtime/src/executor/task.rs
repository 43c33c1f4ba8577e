use std::sync::Arc;
use std::time::Duration;

use podling_core::{should_restart, HealthStatus, Task, TaskStatus};
use tracing::{info, warn};

use crate::agent::{Agent, TaskHandle};
use crate::executor::{build_probe, TASK_NETWORK_SENTINEL, WORKLOAD_DEADLINE};
use crate::probe::{spawn_checker, CheckerParams, OnUnhealthy};
use crate::types::ContainerSpec;

/// Drives one task through its full lifecycle: report running, pull,
/// create, start, report again with the container id, run a liveness
/// checker if declared, wait for exit, report the terminal status, then
/// best-effort remove the container. Always unregisters itself from the
/// agent's registry on the way out, on every exit path.
pub async fn run_task(agent: Arc<Agent>, task_id: String) {
    let outcome = tokio::time::timeout(WORKLOAD_DEADLINE, run_task_inner(&agent, &task_id)).await;
    if outcome.is_err() {
        warn!(task_id, "task executor exceeded its workload deadline");
    }
    agent.unregister_task(&task_id).await;
}

async fn run_task_inner(agent: &Arc<Agent>, task_id: &str) {
    let Some(handle) = agent.get_task_handle(task_id).await else {
        warn!(task_id, "task handle missing at executor start");
        return;
    };

    // Step 1: report running (no container yet assigned).
    mark_and_report(agent, &handle, task_id, TaskStatus::Running, None, None).await;

    let (image, env, resources, liveness_probe, restart_policy) = {
        let t = handle.task.lock().await;
        (
            t.image.clone(),
            t.env.clone(),
            t.resources,
            t.liveness_probe.clone(),
            t.restart_policy,
        )
    };

    // Step 2: pull image.
    if let Err(e) = agent.runtime().pull_image(&image).await {
        let msg = format!("image pull failed: {e}");
        warn!(task_id, error = %msg, "task failed during image pull");
        mark_and_report(agent, &handle, task_id, TaskStatus::Failed, None, Some(msg)).await;
        return;
    }

    // Step 3: create container.
    let mut spec = ContainerSpec::new(format!("podling-task-{task_id}"), image);
    spec.env = env;
    spec.limits = resources.limits;
    let container_id = match agent.runtime().create_container(spec).await {
        Ok(id) => id,
        Err(e) => {
            let msg = format!("container create failed: {e}");
            warn!(task_id, error = %msg, "task failed during container create");
            mark_and_report(agent, &handle, task_id, TaskStatus::Failed, None, Some(msg)).await;
            return;
        }
    };
    {
        let mut t = handle.task.lock().await;
        t.container_id = Some(container_id.clone());
    }

    // Step 4: start container.
    if let Err(e) = agent.runtime().start_container(&container_id).await {
        let msg = format!("container start failed: {e}");
        warn!(task_id, container_id, error = %msg, "task failed during container start");
        mark_and_report(
            agent,
            &handle,
            task_id,
            TaskStatus::Failed,
            Some(container_id.clone()),
            Some(msg),
        )
        .await;
        let _ = agent.runtime().remove_container(&container_id, true).await;
        return;
    }

    // Step 5: report running with the container id now known.
    mark_and_report(
        agent,
        &handle,
        task_id,
        TaskStatus::Running,
        Some(container_id.clone()),
        None,
    )
    .await;

    // Step 6: start the liveness checker, if declared.
    let checker = match &liveness_probe {
        Some(probe_spec) => {
            match build_probe(
                agent.runtime(),
                &container_id,
                TASK_NETWORK_SENTINEL,
                probe_spec,
            )
            .await
            {
                Ok(probe) => {
                    let on_unhealthy = task_unhealthy_callback(
                        Arc::clone(agent),
                        task_id.to_string(),
                        container_id.clone(),
                    );
                    Some(spawn_checker(
                        probe,
                        CheckerParams::from(probe_spec),
                        on_unhealthy,
                    ))
                }
                Err(e) => {
                    warn!(task_id, error = %e, "failed to construct liveness probe, running without one");
                    None
                }
            }
        }
        None => None,
    };

    // Step 7: wait for the container to exit.
    let exit_code = match agent.runtime().wait_container(&container_id).await {
        Ok(code) => code,
        Err(e) => {
            if let Some(c) = &checker {
                c.stop();
            }
            let msg = format!("wait failed: {e}");
            warn!(task_id, container_id, error = %msg, "task failed waiting for exit");
            mark_and_report(
                agent,
                &handle,
                task_id,
                TaskStatus::Failed,
                Some(container_id.clone()),
                Some(msg),
            )
            .await;
            let _ = agent.runtime().remove_container(&container_id, true).await;
            return;
        }
    };

    if let Some(c) = &checker {
        c.stop();
    }

    // Step 8: report the terminal status.
    let (status, error) = if exit_code == 0 {
        (TaskStatus::Completed, None)
    } else {
        (TaskStatus::Failed, Some(format!("container exited with code {exit_code}")))
    };

    if should_restart(restart_policy, exit_code) {
        info!(
            task_id,
            exit_code,
            "restart policy indicates a relaunch would occur; automatic restart is not performed"
        );
    }

    mark_and_report(
        agent,
        &handle,
        task_id,
        status,
        Some(container_id.clone()),
        error,
    )
    .await;

    // Step 9: best-effort container removal.
    if let Err(e) = agent.runtime().remove_container(&container_id, true).await {
        warn!(task_id, container_id, error = %e, "failed to remove container during cleanup");
    }
}

async fn mark_and_report(
    agent: &Arc<Agent>,
    handle: &Arc<TaskHandle>,
    task_id: &str,
    status: TaskStatus,
    container_id: Option<String>,
    error: Option<String>,
) {
    {
        let mut t = handle.task.lock().await;
        t.status = status;
        if container_id.is_some() {
            t.container_id = container_id.clone();
        }
        t.error = error.clone();
    }
    agent.report_task_status(task_id, status, container_id, error).await;
}

fn task_unhealthy_callback(agent: Arc<Agent>, task_id: String, container_id: String) -> OnUnhealthy {
    Arc::new(move || {
        let agent = Arc::clone(&agent);
        let task_id = task_id.clone();
        let container_id = container_id.clone();
        Box::pin(async move {
            warn!(task_id, container_id, "task container failed its liveness check");
            if let Some(handle) = agent.get_task_handle(&task_id).await {
                let mut t = handle.task.lock().await;
                t.health_status = HealthStatus::Unhealthy;
            }
            agent
                .report_task_status(
                    &task_id,
                    TaskStatus::Failed,
                    Some(container_id),
                    Some("container failed health check".to_string()),
                )
                .await;
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;
    use podling_core::RestartPolicy;

    fn make_agent(runtime: Arc<MockRuntime>) -> Arc<Agent> {
        use crate::agent::AgentConfig;
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
    async fn test_happy_task_reaches_completed() {
        let runtime = Arc::new(MockRuntime::new());
        let agent = make_agent(Arc::clone(&runtime));

        let mut task = Task::new("t1", "demo", "alpine:latest");
        task.restart_policy = RestartPolicy::Never;
        agent.register_task_handle(task).await;

        run_task(Arc::clone(&agent), "t1".to_string()).await;

        assert!(agent.get_task("t1").await.is_none());
        assert_eq!(runtime.pulled_images().await, vec!["alpine:latest".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_handle_returns_without_panicking() {
        let runtime = Arc::new(MockRuntime::new());
        let agent = make_agent(runtime);
        run_task(agent, "nonexistent".to_string()).await;
    }
}
