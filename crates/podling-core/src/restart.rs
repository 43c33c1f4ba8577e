use serde::{Deserialize, Serialize};

/// Declarative restart intent for a task or pod container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::Never
    }
}

/// Pure predicate: should a container with this exit code be relaunched
/// under this policy? The worker does not act on this itself (automatic
/// restart is out of scope) but reports the decision for observability.
pub fn should_restart(policy: RestartPolicy, exit_code: i64) -> bool {
    match policy {
        RestartPolicy::Always => true,
        RestartPolicy::OnFailure => exit_code != 0,
        RestartPolicy::Never => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_restart_always() {
        assert!(should_restart(RestartPolicy::Always, 0));
        assert!(should_restart(RestartPolicy::Always, 137));
    }

    #[test]
    fn test_should_restart_never() {
        assert!(!should_restart(RestartPolicy::Never, 0));
        assert!(!should_restart(RestartPolicy::Never, 1));
    }

    #[test]
    fn test_should_restart_on_failure() {
        assert!(!should_restart(RestartPolicy::OnFailure, 0));
        assert!(should_restart(RestartPolicy::OnFailure, 1));
        assert!(should_restart(RestartPolicy::OnFailure, -1));
    }
}
