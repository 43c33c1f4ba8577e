pub mod pod;
pub mod task;

use std::sync::Arc;
use std::time::Duration;

use podling_core::{ProbeAction, ProbeSpec};

use crate::error::Result;
use crate::probe::{ExecProbe, HttpProbe, Probe, TcpProbe};
use crate::traits::RuntimeAdapter;

/// Upper bound on how long a single task or pod execution is allowed to run
/// before the agent stops waiting on it. The underlying container is not
/// killed by this deadline on its own; it only stops the executor task and
/// unregisters it, matching the agent's own bookkeeping with reality.
pub const WORKLOAD_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Network identifier used to resolve a standalone task container's address.
/// Task containers join no pod network, so there is no real network id to
/// pass; the runtime adapter's Docker implementation does not filter by it.
pub(crate) const TASK_NETWORK_SENTINEL: &str = "bridge";

/// Build the `Probe` a `ProbeSpec` describes, resolving the container's IP
/// for HTTP/TCP targets via the runtime adapter.
pub(crate) async fn build_probe(
    runtime: Arc<dyn RuntimeAdapter>,
    container_id: &str,
    network_id: &str,
    spec: &ProbeSpec,
) -> Result<Arc<dyn Probe>> {
    match &spec.action {
        ProbeAction::Http { path, port } => {
            let ip = runtime.container_ip(container_id, network_id).await?;
            let probe = HttpProbe::new(ip, *port, path.clone())?;
            Ok(Arc::new(probe))
        }
        ProbeAction::Tcp { port } => {
            let ip = runtime.container_ip(container_id, network_id).await?;
            Ok(Arc::new(TcpProbe::new(ip, *port)?))
        }
        ProbeAction::Exec { command } => Ok(Arc::new(ExecProbe::new(
            Arc::clone(&runtime),
            container_id,
            command.clone(),
        )?)),
    }
}
