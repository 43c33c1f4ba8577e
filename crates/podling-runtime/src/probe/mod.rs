pub mod checker;
pub mod exec;
pub mod http;
pub mod tcp;

use std::time::Duration;

use async_trait::async_trait;

pub use checker::{spawn_checker, CheckerHandle, CheckerParams, HealthState, OnUnhealthy};
pub use exec::ExecProbe;
pub use http::HttpProbe;
pub use tcp::TcpProbe;

/// Outcome of one probe dial/exec.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
    pub elapsed: Duration,
}

impl ProbeResult {
    pub fn success(elapsed: Duration) -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            elapsed,
        }
    }

    pub fn failure(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            message: message.into(),
            elapsed,
        }
    }
}

/// Shared interface for the three probe kinds. Target validation happens at
/// construction time; `check` just performs one dial/exec against it.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, timeout: Duration) -> ProbeResult;
}
