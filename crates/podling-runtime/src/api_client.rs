use std::time::Duration;

use podling_core::{NodeRegistered, NodeRegistration, PodStatusUpdate, TaskStatusUpdate};
use reqwest::Client;
use tracing::debug;

use crate::error::{Result, RuntimeError};

const REGISTER_TIMEOUT: Duration = Duration::from_secs(10);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(5);
const STATUS_UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound HTTP client the agent uses to talk to the master.
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// POST /api/v1/nodes/register
    pub async fn register(&self, registration: &NodeRegistration) -> Result<NodeRegistered> {
        let url = format!("{}/api/v1/nodes/register", self.base_url);
        debug!(url, "registering with master");

        let resp = self
            .client
            .post(&url)
            .timeout(REGISTER_TIMEOUT)
            .json(registration)
            .send()
            .await
            .map_err(|e| RuntimeError::internal_error(format!("registration request failed: {e}")))?;

        if resp.status() != reqwest::StatusCode::CREATED {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RuntimeError::internal_error(format!(
                "registration failed with status {status}: {body}"
            )));
        }

        resp.json::<NodeRegistered>()
            .await
            .map_err(|e| RuntimeError::internal_error(format!("failed to parse registration response: {e}")))
    }

    /// POST /api/v1/nodes/{node_id}/heartbeat
    pub async fn heartbeat(&self, node_id: &str) -> Result<()> {
        let url = format!("{}/api/v1/nodes/{node_id}/heartbeat", self.base_url);

        let resp = self
            .client
            .post(&url)
            .timeout(HEARTBEAT_TIMEOUT)
            .send()
            .await
            .map_err(|e| RuntimeError::internal_error(format!("heartbeat request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(RuntimeError::internal_error(format!(
                "heartbeat failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// POST /api/v1/nodes/{node_id}/deregister
    pub async fn deregister(&self, node_id: &str) -> Result<()> {
        let url = format!("{}/api/v1/nodes/{node_id}/deregister", self.base_url);

        let resp = self
            .client
            .post(&url)
            .timeout(STATUS_UPDATE_TIMEOUT)
            .send()
            .await
            .map_err(|e| RuntimeError::internal_error(format!("deregister request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(RuntimeError::internal_error(format!(
                "deregister failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// PUT /api/v1/tasks/{id}/status
    pub async fn update_task_status(&self, task_id: &str, update: &TaskStatusUpdate) -> Result<()> {
        let url = format!("{}/api/v1/tasks/{task_id}/status", self.base_url);

        let resp = self
            .client
            .put(&url)
            .timeout(STATUS_UPDATE_TIMEOUT)
            .json(update)
            .send()
            .await
            .map_err(|e| RuntimeError::internal_error(format!("task status update failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(RuntimeError::internal_error(format!(
                "task status update failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// PUT /api/v1/pods/{id}/status
    pub async fn update_pod_status(&self, pod_id: &str, update: &PodStatusUpdate) -> Result<()> {
        let url = format!("{}/api/v1/pods/{pod_id}/status", self.base_url);

        let resp = self
            .client
            .put(&url)
            .timeout(STATUS_UPDATE_TIMEOUT)
            .json(update)
            .send()
            .await
            .map_err(|e| RuntimeError::internal_error(format!("pod status update failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(RuntimeError::internal_error(format!(
                "pod status update failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
