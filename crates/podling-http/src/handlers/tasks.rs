use axum::extract::{Path, Query, State};
use axum::Json;
use podling_core::Task;
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::response::{Accepted, LogsResponse};
use crate::state::AppState;
use crate::validation::validate_task_probes;

/// `POST /api/v1/tasks/{id}/execute` — validates the body against the path
/// id and every declared probe, then dispatches the task to a detached
/// executor and returns `202` immediately.
pub async fn execute_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(task): Json<Task>,
) -> Result<Accepted> {
    if task.task_id != id {
        return Err(ApiError::BadRequest(format!(
            "task id in body ('{}') does not match path ('{id}')",
            task.task_id
        )));
    }
    validate_task_probes(&task)?;

    state.agent.execute_task(task).await;
    Ok(Accepted::task(id))
}

/// `GET /api/v1/tasks/{id}/status` — reads the live task from the running
/// registry; `404` once the executor has unregistered it.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>> {
    state
        .agent
        .get_task(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("task '{id}' not found")))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub tail: Option<String>,
}

/// `GET /api/v1/tasks/{id}/logs?tail=N` — tails the task's container logs
/// via the runtime adapter. `400` on an unparsable `tail`, `500` on a
/// runtime fault (the container was removed, the daemon is unreachable).
pub async fn get_task_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>> {
    let tail = match query.tail {
        None => None,
        Some(raw) => Some(
            raw.parse::<u32>()
                .map_err(|_| ApiError::BadRequest(format!("invalid tail value '{raw}'")))?,
        ),
    };

    let logs = state.agent.get_task_logs(&id, tail).await?;
    Ok(Json(LogsResponse {
        task_id: id,
        logs,
        tail,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path as AxPath, Query as AxQuery, State as AxState};
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
    async fn test_execute_task_rejects_id_mismatch() {
        let state = make_state();
        let task = Task::new("other", "demo", "alpine:latest");
        let result = execute_task(
            AxState(state),
            AxPath("t1".to_string()),
            Json(task),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_execute_task_rejects_invalid_probe() {
        let state = make_state();
        let mut task = Task::new("t1", "demo", "alpine:latest");
        task.liveness_probe = Some(podling_core::ProbeSpec::http("no-leading-slash", 8080));
        let result = execute_task(AxState(state), AxPath("t1".to_string()), Json(task)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_task_status_404_when_absent() {
        let state = make_state();
        let result = get_task_status(AxState(state), AxPath("missing".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_task_logs_rejects_bad_tail() {
        let state = make_state();
        let result = get_task_logs(
            AxState(state),
            AxPath("t1".to_string()),
            AxQuery(LogsQuery {
                tail: Some("not-a-number".to_string()),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
