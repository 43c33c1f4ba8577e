use serde::{Deserialize, Serialize};

fn default_period() -> u32 {
    10
}
fn default_timeout() -> u32 {
    1
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_success_threshold() -> u32 {
    1
}

/// The check a probe performs. Wire-compatible with what the master sends
/// down in a task or pod container spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeAction {
    Http { path: String, port: u16 },
    Tcp { port: u16 },
    Exec { command: Vec<String> },
}

/// A single liveness or readiness probe declaration, with k8s-derived
/// default timings applied where the master omits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSpec {
    #[serde(flatten)]
    pub action: ProbeAction,
    #[serde(default)]
    pub initial_delay_seconds: u32,
    #[serde(default = "default_period")]
    pub period_seconds: u32,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl ProbeSpec {
    pub fn http(path: impl Into<String>, port: u16) -> Self {
        Self {
            action: ProbeAction::Http {
                path: path.into(),
                port,
            },
            initial_delay_seconds: 0,
            period_seconds: default_period(),
            timeout_seconds: default_timeout(),
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
        }
    }

    pub fn tcp(port: u16) -> Self {
        Self {
            action: ProbeAction::Tcp { port },
            initial_delay_seconds: 0,
            period_seconds: default_period(),
            timeout_seconds: default_timeout(),
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
        }
    }

    pub fn exec(command: Vec<String>) -> Self {
        Self {
            action: ProbeAction::Exec { command },
            initial_delay_seconds: 0,
            period_seconds: default_period(),
            timeout_seconds: default_timeout(),
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_defaults() {
        let p = ProbeSpec::http("/healthz", 8080);
        assert_eq!(p.period_seconds, 10);
        assert_eq!(p.timeout_seconds, 1);
        assert_eq!(p.failure_threshold, 3);
        assert_eq!(p.success_threshold, 1);
    }

    #[test]
    fn test_deserialize_with_partial_timings() {
        let json = r#"{"kind":"http","path":"/ready","port":9000,"period_seconds":2}"#;
        let p: ProbeSpec = serde_json::from_str(json).unwrap();
        assert_eq!(p.period_seconds, 2);
        assert_eq!(p.failure_threshold, 3);
        assert!(matches!(p.action, ProbeAction::Http { port: 9000, .. }));
    }
}
