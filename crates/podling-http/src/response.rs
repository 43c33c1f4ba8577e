use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `200 {status,service,node_id}` body for `/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub node_id: Option<String>,
}

/// `202 {message,task_id}` / `202 {message,pod_id}` body returned immediately
/// after a workload is registered and its executor is spawned.
#[derive(Debug, Serialize)]
pub struct Accepted {
    pub message: String,
    #[serde(flatten)]
    pub id: AcceptedId,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AcceptedId {
    Task { task_id: String },
    Pod { pod_id: String },
}

impl Accepted {
    pub fn task(task_id: impl Into<String>) -> Self {
        Self {
            message: "task accepted".to_string(),
            id: AcceptedId::Task {
                task_id: task_id.into(),
            },
        }
    }

    pub fn pod(pod_id: impl Into<String>) -> Self {
        Self {
            message: "pod accepted".to_string(),
            id: AcceptedId::Pod {
                pod_id: pod_id.into(),
            },
        }
    }
}

impl IntoResponse for Accepted {
    fn into_response(self) -> Response {
        (StatusCode::ACCEPTED, Json(self)).into_response()
    }
}

/// `200 {task_id, logs, tail}` body for `/api/v1/tasks/{id}/logs`.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub task_id: String,
    pub logs: String,
    pub tail: Option<u32>,
}
