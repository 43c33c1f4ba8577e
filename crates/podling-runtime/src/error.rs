use miette::Diagnostic;
use thiserror::Error;

/// Runtime error type for container and pod-network operations.
#[derive(Error, Debug, Diagnostic)]
pub enum RuntimeError {
    #[error("container not found: {container_id}")]
    #[diagnostic(
        code(podling::runtime::container_not_found),
        help("the container may have already been removed")
    )]
    ContainerNotFound {
        #[allow(unused)]
        container_id: String,
    },

    #[error("image pull failed for '{image}': {message}")]
    #[diagnostic(
        code(podling::runtime::image_pull_failed),
        help("verify the image name and tag, and that the registry is reachable")
    )]
    ImagePullFailed {
        #[allow(unused)]
        image: String,
        #[allow(unused)]
        message: String,
    },

    #[error("container operation failed for '{container_id}': {message}")]
    #[diagnostic(code(podling::runtime::container_operation_failed))]
    ContainerOperationFailed {
        #[allow(unused)]
        container_id: String,
        #[allow(unused)]
        message: String,
    },

    #[error("network operation failed: {message}")]
    #[diagnostic(
        code(podling::runtime::network_error),
        help("verify the container runtime's network driver is available")
    )]
    NetworkError {
        #[allow(unused)]
        message: String,
    },

    #[error("exec failed in container '{container_id}': {message}")]
    #[diagnostic(code(podling::runtime::exec_failed))]
    ExecFailed {
        #[allow(unused)]
        container_id: String,
        #[allow(unused)]
        message: String,
    },

    #[error("invalid probe target: {reason}")]
    #[diagnostic(
        code(podling::runtime::invalid_probe_target),
        help("probes may only target private or loopback addresses")
    )]
    InvalidProbeTarget {
        #[allow(unused)]
        reason: String,
    },

    #[error("resource detection failed: {message}")]
    #[diagnostic(
        code(podling::runtime::resource_detection_failed),
        help("the host may be missing permissions to query CPU/memory info")
    )]
    ResourceDetectionFailed {
        #[allow(unused)]
        message: String,
    },

    #[error("task not found: {task_id}")]
    #[diagnostic(code(podling::runtime::task_not_found))]
    TaskNotFound {
        #[allow(unused)]
        task_id: String,
    },

    #[error("pod not found: {pod_id}")]
    #[diagnostic(code(podling::runtime::pod_not_found))]
    PodNotFound {
        #[allow(unused)]
        pod_id: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    CoreError(#[from] podling_core::CoreError),

    #[error("internal runtime error: {message}")]
    #[diagnostic(
        code(podling::runtime::internal_error),
        help("this is likely a bug. please report it with the full error details")
    )]
    InternalError {
        #[allow(unused)]
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

impl RuntimeError {
    pub fn container_not_found(container_id: impl Into<String>) -> Self {
        Self::ContainerNotFound {
            container_id: container_id.into(),
        }
    }

    pub fn image_pull_failed(image: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ImagePullFailed {
            image: image.into(),
            message: message.into(),
        }
    }

    pub fn container_operation_failed(
        container_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ContainerOperationFailed {
            container_id: container_id.into(),
            message: message.into(),
        }
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    pub fn exec_failed(container_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecFailed {
            container_id: container_id.into(),
            message: message.into(),
        }
    }

    pub fn invalid_probe_target(reason: impl Into<String>) -> Self {
        Self::InvalidProbeTarget {
            reason: reason.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    pub fn resource_detection_failed(message: impl Into<String>) -> Self {
        Self::ResourceDetectionFailed {
            message: message.into(),
        }
    }

    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    pub fn pod_not_found(pod_id: impl Into<String>) -> Self {
        Self::PodNotFound {
            pod_id: pod_id.into(),
        }
    }
}
