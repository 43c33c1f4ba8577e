use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::{Result, RuntimeError};
use crate::probe::{Probe, ProbeResult};
use crate::traits::RuntimeAdapter;

/// Runs a command inside a running container via the Runtime Adapter.
/// Success iff the command exits 0.
pub struct ExecProbe {
    runtime: Arc<dyn RuntimeAdapter>,
    container_id: String,
    command: Vec<String>,
}

impl ExecProbe {
    pub fn new(
        runtime: Arc<dyn RuntimeAdapter>,
        container_id: impl Into<String>,
        command: Vec<String>,
    ) -> Result<Self> {
        if command.is_empty() {
            return Err(RuntimeError::invalid_probe_target("exec probe command must not be empty"));
        }
        if command.iter().any(|arg| arg.bytes().any(|b| b == 0)) {
            return Err(RuntimeError::invalid_probe_target(
                "exec probe argv must not contain NUL bytes",
            ));
        }
        Ok(Self {
            runtime,
            container_id: container_id.into(),
            command,
        })
    }
}

#[async_trait]
impl Probe for ExecProbe {
    async fn check(&self, timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        let result = tokio::time::timeout(
            timeout,
            self.runtime.exec_in_container(&self.container_id, &self.command),
        )
        .await;

        match result {
            Ok(Ok((0, _))) => ProbeResult::success(start.elapsed()),
            Ok(Ok((code, output))) => ProbeResult::failure(
                format!("exec probe exited with code {code}: {}", output.trim()),
                start.elapsed(),
            ),
            Ok(Err(e)) => ProbeResult::failure(format!("exec probe failed: {e}"), start.elapsed()),
            Err(_) => ProbeResult::failure("exec probe timed out", start.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;
    use crate::types::ContainerSpec;

    #[test]
    fn test_rejects_empty_command() {
        let runtime = Arc::new(MockRuntime::new());
        let result = ExecProbe::new(runtime, "c1", vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_nul_byte_in_argv() {
        let runtime = Arc::new(MockRuntime::new());
        let result = ExecProbe::new(runtime, "c1", vec!["echo\0".to_string()]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_check_succeeds_on_zero_exit() {
        let runtime = Arc::new(MockRuntime::new());
        let id = runtime
            .create_container(ContainerSpec::new("web", "alpine:latest"))
            .await
            .unwrap();
        runtime.start_container(&id).await.unwrap();

        let probe = ExecProbe::new(runtime, id, vec!["true".to_string()]).unwrap();
        let result = probe.check(Duration::from_secs(1)).await;
        assert!(result.success);
    }
}
