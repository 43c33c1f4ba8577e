use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, Result};

/// Resource quantities for tasks and pod containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuantities {
    /// CPU in millicores (1000 = 1 core). `0` means unbounded.
    pub cpu_millicores: i64,
    /// Memory in bytes. `0` means unbounded.
    pub memory_bytes: i64,
}

impl ResourceQuantities {
    /// Parse a CPU string (e.g. "2", "1000m", "0.5").
    pub fn parse_cpu(s: &str) -> Result<i64> {
        if let Some(m) = s.strip_suffix('m') {
            m.parse::<i64>()
                .map_err(|e| CoreError::invalid_quantity(format!("invalid cpu millicores: {e}")))
        } else if let Ok(cores) = s.parse::<f64>() {
            Ok((cores * 1000.0) as i64)
        } else {
            Err(CoreError::invalid_quantity(format!("invalid cpu format: {s}")))
        }
    }

    /// Parse a memory string (e.g. "128Mi", "1Gi", "1024").
    pub fn parse_memory(s: &str) -> Result<i64> {
        let bad = |e: std::num::ParseIntError| CoreError::invalid_quantity(e.to_string());
        if let Some(num) = s.strip_suffix("Ki") {
            Ok(num.parse::<i64>().map_err(bad)? * 1024)
        } else if let Some(num) = s.strip_suffix("Mi") {
            Ok(num.parse::<i64>().map_err(bad)? * 1024 * 1024)
        } else if let Some(num) = s.strip_suffix("Gi") {
            Ok(num.parse::<i64>().map_err(bad)? * 1024 * 1024 * 1024)
        } else {
            s.parse::<i64>().map_err(bad)
        }
    }

    /// Build quantities from a plain string map, as carried on the wire from
    /// the master (`{"cpu": "500m", "memory": "256Mi"}`). Unknown or
    /// unparsable entries are ignored rather than rejected.
    pub fn from_resource_map(resources: &HashMap<String, String>) -> Self {
        let cpu_millicores = resources
            .get("cpu")
            .and_then(|s| Self::parse_cpu(s).ok())
            .unwrap_or(0);

        let memory_bytes = resources
            .get("memory")
            .and_then(|s| Self::parse_memory(s).ok())
            .unwrap_or(0);

        Self {
            cpu_millicores,
            memory_bytes,
        }
    }
}

/// Resource requests and limits for a task or pod container. Only `limits`
/// are enforced by the runtime adapter today; `requests` are carried through
/// for the master's bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(default)]
    pub requests: ResourceQuantities,
    #[serde(default)]
    pub limits: ResourceQuantities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu() {
        assert_eq!(ResourceQuantities::parse_cpu("1").unwrap(), 1000);
        assert_eq!(ResourceQuantities::parse_cpu("0.5").unwrap(), 500);
        assert_eq!(ResourceQuantities::parse_cpu("100m").unwrap(), 100);
        assert_eq!(ResourceQuantities::parse_cpu("2").unwrap(), 2000);
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(ResourceQuantities::parse_memory("1024").unwrap(), 1024);
        assert_eq!(ResourceQuantities::parse_memory("1Ki").unwrap(), 1024);
        assert_eq!(
            ResourceQuantities::parse_memory("128Mi").unwrap(),
            128 * 1024 * 1024
        );
        assert_eq!(
            ResourceQuantities::parse_memory("1Gi").unwrap(),
            1024 * 1024 * 1024
        );
    }

    #[test]
    fn test_from_resource_map_ignores_unparsable() {
        let mut m = HashMap::new();
        m.insert("cpu".to_string(), "not-a-number".to_string());
        let q = ResourceQuantities::from_resource_map(&m);
        assert_eq!(q.cpu_millicores, 0);
    }
}
