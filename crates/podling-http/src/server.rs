use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{execute_pod, execute_task, get_pod_status, get_task_logs, get_task_status, health};
use crate::state::AppState;

/// Inbound HTTP server configuration.
#[derive(Clone)]
pub struct Config {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7070".parse().unwrap(),
        }
    }
}

/// The worker's inbound API surface — the thin HTTP layer the master calls
/// to dispatch work and query state.
pub struct ApiServer {
    config: Config,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/api/v1/tasks/{id}/execute", post(execute_task))
            .route("/api/v1/tasks/{id}/status", get(get_task_status))
            .route("/api/v1/tasks/{id}/logs", get(get_task_logs))
            .route("/api/v1/pods/{id}/execute", post(execute_pod))
            .route("/api/v1/pods/{id}/status", get(get_pod_status))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until `token` is cancelled, then drain in-flight
    /// connections via axum's graceful shutdown.
    pub async fn run(self, token: CancellationToken) -> Result<(), std::io::Error> {
        let app = self.build_router();

        info!(addr = %self.config.listen_addr, "starting inbound HTTP server");
        let listener = TcpListener::bind(self.config.listen_addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                token.cancelled().await;
                info!("inbound HTTP server draining connections");
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:7070");
    }

    #[test]
    fn test_build_router() {
        let server = ApiServer::new(Config::default(), make_state());
        let router = server.build_router();
        assert!(std::mem::size_of_val(&router) > 0);
    }
}
