//! Podling Runtime - the Runtime Adapter, Probe Engine, Task/Pod Executors,
//! Agent Core, and outbound API client used by the worker agent.

// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod agent;
pub mod api_client;
pub mod docker;
pub mod error;
pub mod executor;
pub mod mock;
pub mod probe;
pub mod sysinfo;
pub mod traits;
pub mod types;

pub use agent::{Agent, AgentConfig, PodHandle, TaskHandle};
pub use api_client::ApiClient;
pub use docker::DockerRuntime;
pub use error::{Result, RuntimeError};
pub use mock::MockRuntime;
pub use probe::{
    spawn_checker, CheckerHandle, CheckerParams, ExecProbe, HealthState, HttpProbe, OnUnhealthy,
    Probe, ProbeResult, TcpProbe,
};
pub use sysinfo::{detect_hostname, detect_system_resources, SystemResources};
pub use traits::RuntimeAdapter;
pub use types::ContainerSpec;
