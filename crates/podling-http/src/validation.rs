use podling_core::{Pod, ProbeAction, ProbeSpec, Task};

use crate::error::{ApiError, Result};

/// Validate every probe a task declares (liveness and readiness).
pub fn validate_task_probes(task: &Task) -> Result<()> {
    if let Some(probe) = &task.liveness_probe {
        validate_probe_spec(probe)?;
    }
    if let Some(probe) = &task.readiness_probe {
        validate_probe_spec(probe)?;
    }
    Ok(())
}

/// Validate every probe every container in a pod declares.
pub fn validate_pod_probes(pod: &Pod) -> Result<()> {
    for container in &pod.containers {
        for probe in [&container.liveness_probe, &container.readiness_probe]
            .into_iter()
            .flatten()
        {
            if let Err(ApiError::BadRequest(msg)) = validate_probe_spec(probe) {
                return Err(ApiError::BadRequest(format!(
                    "container '{}': {msg}",
                    container.name
                )));
            }
        }
    }
    Ok(())
}

/// Validate a probe spec before a task or pod is dispatched. Rejects path
/// traversal, control characters in HTTP paths, invalid port ranges, zero
/// thresholds, empty exec argv, and NUL bytes in argv — all surfaced to the
/// master as `400 Bad Request` before the workload is ever registered.
pub fn validate_probe_spec(spec: &ProbeSpec) -> Result<()> {
    if spec.success_threshold == 0 {
        return Err(ApiError::BadRequest(
            "probe success_threshold must be at least 1".to_string(),
        ));
    }
    if spec.failure_threshold == 0 {
        return Err(ApiError::BadRequest(
            "probe failure_threshold must be at least 1".to_string(),
        ));
    }

    match &spec.action {
        ProbeAction::Http { path, port } => {
            validate_port(*port)?;
            validate_http_path(path)?;
        }
        ProbeAction::Tcp { port } => {
            validate_port(*port)?;
        }
        ProbeAction::Exec { command } => {
            if command.is_empty() {
                return Err(ApiError::BadRequest(
                    "exec probe command must not be empty".to_string(),
                ));
            }
            if command.iter().any(|arg| arg.bytes().any(|b| b == 0)) {
                return Err(ApiError::BadRequest(
                    "exec probe argv must not contain NUL bytes".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ApiError::BadRequest(
            "probe port must be in 1..=65535".to_string(),
        ));
    }
    Ok(())
}

fn validate_http_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(ApiError::BadRequest(
            "probe http path must start with '/'".to_string(),
        ));
    }
    if path.bytes().any(|b| b == 0 || b == b'\r' || b == b'\n') {
        return Err(ApiError::BadRequest(
            "probe http path must not contain NUL, CR, or LF".to_string(),
        ));
    }
    if path.starts_with("/..") || path.ends_with("/..") {
        return Err(ApiError::BadRequest(
            "probe http path must not attempt traversal".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_http_probe() {
        assert!(validate_probe_spec(&ProbeSpec::http("/healthz", 8080)).is_ok());
    }

    #[test]
    fn test_rejects_missing_leading_slash() {
        let spec = ProbeSpec::http("healthz", 8080);
        assert!(validate_probe_spec(&spec).is_err());
    }

    #[test]
    fn test_rejects_path_traversal_at_either_end() {
        assert!(validate_probe_spec(&ProbeSpec::http("/../etc/passwd", 8080)).is_err());
        assert!(validate_probe_spec(&ProbeSpec::http("/foo/..", 8080)).is_err());
    }

    #[test]
    fn test_rejects_control_characters() {
        assert!(validate_probe_spec(&ProbeSpec::http("/foo\r\nbar", 8080)).is_err());
    }

    #[test]
    fn test_rejects_zero_port() {
        assert!(validate_probe_spec(&ProbeSpec::http("/healthz", 0)).is_err());
        assert!(validate_probe_spec(&ProbeSpec::tcp(0)).is_err());
    }

    #[test]
    fn test_rejects_zero_thresholds() {
        let mut spec = ProbeSpec::tcp(8080);
        spec.failure_threshold = 0;
        assert!(validate_probe_spec(&spec).is_err());

        let mut spec = ProbeSpec::tcp(8080);
        spec.success_threshold = 0;
        assert!(validate_probe_spec(&spec).is_err());
    }

    #[test]
    fn test_rejects_empty_exec_argv() {
        assert!(validate_probe_spec(&ProbeSpec::exec(vec![])).is_err());
    }

    #[test]
    fn test_rejects_nul_byte_in_exec_argv() {
        assert!(validate_probe_spec(&ProbeSpec::exec(vec!["echo\0".to_string()])).is_err());
    }

    #[test]
    fn test_validate_task_probes_surfaces_liveness_and_readiness() {
        let mut task = Task::new("t1", "demo", "alpine:latest");
        assert!(validate_task_probes(&task).is_ok());

        task.liveness_probe = Some(ProbeSpec::http("bad", 8080));
        assert!(validate_task_probes(&task).is_err());

        task.liveness_probe = None;
        task.readiness_probe = Some(ProbeSpec::exec(vec![]));
        assert!(validate_task_probes(&task).is_err());
    }

    #[test]
    fn test_validate_pod_probes_names_the_offending_container() {
        use podling_core::PodContainer;

        let mut pod = Pod::new("p1", "demo", "node-1");
        let mut bad = PodContainer::new("web", "nginx:latest");
        bad.liveness_probe = Some(ProbeSpec::tcp(0));
        pod.containers.push(bad);

        let err = validate_pod_probes(&pod).unwrap_err();
        match err {
            ApiError::BadRequest(msg) => assert!(msg.contains("web")),
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }
}
