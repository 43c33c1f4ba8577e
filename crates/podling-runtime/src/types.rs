use std::collections::BTreeMap;

use podling_core::ResourceQuantities;

/// Label applied to every container created by this worker. The external
/// prune tool relies on this to distinguish worker-managed containers from
/// everything else running on the host.
pub const MANAGED_LABEL_KEY: &str = "managed";
pub const MANAGED_LABEL_VALUE: &str = "true";

pub const POD_NETWORK_LABEL_ID: &str = "pod-id";
pub const POD_NETWORK_LABEL_TYPE: &str = "type";
pub const POD_NETWORK_LABEL_TYPE_VALUE: &str = "pod-network";

/// Everything needed to create one container via the runtime adapter.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Name used for the runtime's own container naming, not necessarily
    /// the task/pod-container name (caller derives it deterministically).
    pub name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub limits: ResourceQuantities,
    /// Pod network to join, if any. `None` for a standalone task container.
    pub network_id: Option<String>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            env: BTreeMap::new(),
            limits: ResourceQuantities::default(),
            network_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_spec_defaults() {
        let spec = ContainerSpec::new("c1", "alpine:latest");
        assert!(spec.env.is_empty());
        assert!(spec.network_id.is_none());
    }
}
