use axum::extract::{Path, State};
use axum::Json;
use podling_core::Pod;

use crate::error::{ApiError, Result};
use crate::response::Accepted;
use crate::state::AppState;
use crate::validation::validate_pod_probes;

/// `POST /api/v1/pods/{id}/execute` — mirrors `execute_task`'s validation
/// and dispatch discipline for multi-container pods.
pub async fn execute_pod(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(pod): Json<Pod>,
) -> Result<Accepted> {
    if pod.pod_id != id {
        return Err(ApiError::BadRequest(format!(
            "pod id in body ('{}') does not match path ('{id}')",
            pod.pod_id
        )));
    }
    validate_pod_probes(&pod)?;

    state.agent.execute_pod(pod).await;
    Ok(Accepted::pod(id))
}

/// `GET /api/v1/pods/{id}/status` — reads the live pod from the running
/// registry; `404` once the executor has unregistered it.
pub async fn get_pod_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Pod>> {
    state
        .agent
        .get_pod(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("pod '{id}' not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path as AxPath, State as AxState};
    use podling_core::PodContainer;
    use podling_runtime::mock::MockRuntime;
    use podling_runtime::{Agent, AgentConfig};
    use std::sync::Arc;
    use std::time::Duration;

    fn make_state() -> AppState {
        let agent = Agent::new(
            AgentConfig {
                hostname: "worker-test".to_string(),
                port: 7070,
                master_url: "http://127.0.0.1:1".to_string(),
                heartbeat_interval: Duration::from_secs(10),
                shutdown_timeout: Duration::from_secs(30),
            },
            Arc::new(MockRuntime::new()),
        );
        AppState::new(Arc::new(agent))
    }

    #[tokio::test]
    async fn test_execute_pod_rejects_id_mismatch() {
        let state = make_state();
        let pod = Pod::new("other", "demo", "node-1");
        let result = execute_pod(AxState(state), AxPath("p1".to_string()), Json(pod)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_execute_pod_rejects_invalid_container_probe() {
        let state = make_state();
        let mut pod = Pod::new("p1", "demo", "node-1");
        let mut c = PodContainer::new("web", "nginx:latest");
        c.liveness_probe = Some(podling_core::ProbeSpec::exec(vec![]));
        pod.containers.push(c);

        let result = execute_pod(AxState(state), AxPath("p1".to_string()), Json(pod)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_pod_status_404_when_absent() {
        let state = make_state();
        let result = get_pod_status(AxState(state), AxPath("missing".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
