use crate::error::RuntimeError;

/// Detected physical resources of the host, reported to the master as
/// registration hints (see `Agent::register`).
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Number of logical CPUs.
    pub cpu_count: u32,
    /// Total physical memory in bytes.
    pub total_memory_bytes: u64,
}

/// Detect the host's reported hostname, falling back to `"localhost"` if the
/// platform call fails (e.g. in a sandboxed or misconfigured environment).
pub fn detect_hostname() -> String {
    sys_info::hostname().unwrap_or_else(|_| "localhost".to_string())
}

/// Detect the host's CPU count and total memory.
///
/// Uses the `sys_info` crate which supports Linux, illumos, and macOS.
pub fn detect_system_resources() -> Result<SystemResources, RuntimeError> {
    let cpu_count = sys_info::cpu_num()
        .map_err(|e| RuntimeError::resource_detection_failed(format!("cpu count: {e}")))?;

    let mem = sys_info::mem_info()
        .map_err(|e| RuntimeError::resource_detection_failed(format!("memory: {e}")))?;

    // sys_info::mem_info().total is in KiB
    let total_memory_bytes = mem.total * 1024;

    Ok(SystemResources {
        cpu_count,
        total_memory_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_system_resources() {
        let res = detect_system_resources().expect("detection should succeed in test env");
        assert!(res.cpu_count > 0, "should detect at least 1 CPU");
        assert!(res.total_memory_bytes > 0, "should detect nonzero memory");
    }

    #[test]
    fn test_detect_hostname_never_empty() {
        assert!(!detect_hostname().is_empty());
    }
}
