use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use bollard::secret::{ContainerCreateBody, EndpointSettings, HostConfig, NetworkingConfig};
use bollard::Docker;
use futures_util::stream::TryStreamExt;
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::traits::RuntimeAdapter;
use crate::types::{ContainerSpec, MANAGED_LABEL_KEY, MANAGED_LABEL_VALUE, POD_NETWORK_LABEL_ID, POD_NETWORK_LABEL_TYPE, POD_NETWORK_LABEL_TYPE_VALUE};

/// Production runtime adapter backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect using the standard Docker environment (`DOCKER_HOST`, unix
    /// socket default). Pass `host` to override the connection address.
    pub fn connect(host: Option<&str>) -> Result<Self> {
        let client = match host {
            Some(h) => Docker::connect_with_http(h, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeError::internal_error(format!("docker connect failed: {e}")))?,
            None => Docker::connect_with_local_defaults()
                .map_err(|e| RuntimeError::internal_error(format!("docker connect failed: {e}")))?,
        };
        Ok(Self { client })
    }

    fn client(&self) -> Docker {
        self.client.clone()
    }
}

#[async_trait]
impl RuntimeAdapter for DockerRuntime {
    async fn pull_image(&self, image: &str) -> Result<()> {
        let docker = self.client();
        let options = Some(CreateImageOptions {
            from_image: Some(image.to_string()),
            ..Default::default()
        });

        let mut stream = docker.create_image(options, None, None);
        debug!(image, "pulling image");
        while stream
            .try_next()
            .await
            .map_err(|e| RuntimeError::image_pull_failed(image, e.to_string()))?
            .is_some()
        {}

        Ok(())
    }

    async fn create_container(&self, spec: ContainerSpec) -> Result<String> {
        let docker = self.client();

        let mut labels = HashMap::new();
        labels.insert(MANAGED_LABEL_KEY.to_string(), MANAGED_LABEL_VALUE.to_string());

        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let mut host_config = HostConfig {
            ..Default::default()
        };
        if spec.limits.cpu_millicores > 0 {
            // NanoCPUs is billionths of a CPU; millicores are thousandths.
            host_config.nano_cpus = Some(spec.limits.cpu_millicores * 1_000_000);
        }
        if spec.limits.memory_bytes > 0 {
            host_config.memory = Some(spec.limits.memory_bytes);
        }

        let networking_config = spec.network_id.as_ref().map(|network_id| NetworkingConfig {
            endpoints_config: HashMap::from([(
                network_id.clone(),
                EndpointSettings::default(),
            )]),
        });

        let config = ContainerCreateBody {
            image: Some(spec.image.clone()),
            env: Some(env),
            labels: Some(labels),
            host_config: Some(host_config),
            networking_config,
            ..Default::default()
        };

        let options = Some(CreateContainerOptions {
            name: Some(spec.name.clone()),
            platform: None,
        });

        let created = docker
            .create_container(options, config)
            .await
            .map_err(|e| RuntimeError::container_operation_failed(&spec.name, format!("create: {e}")))?;

        Ok(created.id)
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        self.client()
            .start_container(container_id, None::<StartContainerOptions>)
            .await
            .map_err(|e| RuntimeError::container_operation_failed(container_id, format!("start: {e}")))
    }

    async fn stop_container(&self, container_id: &str, grace: Duration) -> Result<()> {
        let options = Some(StopContainerOptions {
            t: Some(grace.as_secs() as i32),
            ..Default::default()
        });
        self.client()
            .stop_container(container_id, options)
            .await
            .map_err(|e| RuntimeError::container_operation_failed(container_id, format!("stop: {e}")))
    }

    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()> {
        let options = Some(RemoveContainerOptions {
            force,
            ..Default::default()
        });
        self.client()
            .remove_container(container_id, options)
            .await
            .map_err(|e| RuntimeError::container_operation_failed(container_id, format!("remove: {e}")))
    }

    async fn wait_container(&self, container_id: &str) -> Result<i64> {
        let mut stream = self
            .client()
            .wait_container(container_id, None::<WaitContainerOptions>);

        match stream.try_next().await {
            Ok(Some(response)) => Ok(response.status_code),
            Ok(None) => Ok(0),
            Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => Ok(code),
            Err(e) => Err(RuntimeError::container_operation_failed(
                container_id,
                format!("wait: {e}"),
            )),
        }
    }

    async fn container_logs(&self, container_id: &str, tail: Option<u32>) -> Result<String> {
        let options = Some(LogsOptions {
            stdout: true,
            stderr: true,
            follow: false,
            tail: tail.map(|n| n.to_string()).unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        });

        let mut stream = self.client().logs(container_id, options);
        let mut output = String::new();
        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| RuntimeError::container_operation_failed(container_id, format!("logs: {e}")))?
        {
            match chunk {
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message } => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                _ => {}
            }
        }
        Ok(output)
    }

    async fn exec_in_container(&self, container_id: &str, argv: &[String]) -> Result<(i64, String)> {
        use bollard::exec::{CreateExecOptions, StartExecResults};

        let docker = self.client();
        let exec = docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(argv.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| RuntimeError::exec_failed(container_id, e.to_string()))?;

        let mut output = String::new();
        if let StartExecResults::Attached { mut output: stream, .. } = docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| RuntimeError::exec_failed(container_id, e.to_string()))?
        {
            while let Some(chunk) = stream
                .try_next()
                .await
                .map_err(|e| RuntimeError::exec_failed(container_id, e.to_string()))?
            {
                output.push_str(&chunk.to_string());
            }
        }

        let inspect = docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| RuntimeError::exec_failed(container_id, e.to_string()))?;
        let exit_code = inspect.exit_code.unwrap_or(0);

        Ok((exit_code, output))
    }

    async fn create_pod_network(&self, pod_id: &str) -> Result<String> {
        use bollard::query_parameters::CreateNetworkOptionsBuilder;

        let mut labels = HashMap::new();
        labels.insert(POD_NETWORK_LABEL_ID.to_string(), pod_id.to_string());
        labels.insert(
            POD_NETWORK_LABEL_TYPE.to_string(),
            POD_NETWORK_LABEL_TYPE_VALUE.to_string(),
        );

        let options = CreateNetworkOptionsBuilder::new()
            .name(&format!("pod-{pod_id}"))
            .driver("bridge")
            .labels(&labels.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect())
            .build();

        let response = self
            .client()
            .create_network(options)
            .await
            .map_err(|e| RuntimeError::network_error(e.to_string()))?;

        response
            .id
            .ok_or_else(|| RuntimeError::network_error("docker did not return a network id"))
    }

    async fn remove_pod_network(&self, network_id: &str) -> Result<()> {
        self.client()
            .remove_network(network_id)
            .await
            .map_err(|e| RuntimeError::network_error(format!("remove network {network_id}: {e}")))
    }

    async fn container_ip(&self, container_id: &str, network_id: &str) -> Result<IpAddr> {
        let inspect = self
            .client()
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| RuntimeError::container_operation_failed(container_id, format!("inspect: {e}")))?;

        let networks = inspect
            .network_settings
            .and_then(|s| s.networks)
            .ok_or_else(|| RuntimeError::network_error("container has no network settings"))?;

        let ip = networks
            .values()
            .find_map(|n| n.ip_address.clone())
            .filter(|ip| !ip.is_empty());

        let ip = match ip {
            Some(ip) => ip,
            None => {
                return Err(RuntimeError::network_error(format!(
                    "no IP assigned to container {container_id} on network {network_id}"
                )))
            }
        };

        IpAddr::from_str(&ip)
            .map_err(|e| RuntimeError::network_error(format!("invalid IP '{ip}': {e}")))
    }
}
