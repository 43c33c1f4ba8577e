use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::{Result, RuntimeError};
use crate::probe::{Probe, ProbeResult};

/// Plain TCP connect check. Success iff the dial completes without error.
pub struct TcpProbe {
    ip: IpAddr,
    port: u16,
}

impl TcpProbe {
    pub fn new(ip: IpAddr, port: u16) -> Result<Self> {
        if port == 0 {
            return Err(RuntimeError::invalid_probe_target("port must be in 1..=65535"));
        }
        Ok(Self { ip, port })
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self, timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        match tokio::time::timeout(timeout, TcpStream::connect((self.ip, self.port))).await {
            Ok(Ok(_stream)) => ProbeResult::success(start.elapsed()),
            Ok(Err(e)) => ProbeResult::failure(format!("tcp connect failed: {e}"), start.elapsed()),
            Err(_) => ProbeResult::failure("tcp probe timed out", start.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_rejects_zero_port() {
        assert!(TcpProbe::new("127.0.0.1".parse().unwrap(), 0).is_err());
    }

    #[tokio::test]
    async fn test_check_succeeds_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let probe = TcpProbe::new(addr.ip(), addr.port()).unwrap();
        let result = probe.check(Duration::from_secs(2)).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_check_fails_against_closed_port() {
        let probe = TcpProbe::new("127.0.0.1".parse().unwrap(), 1).unwrap();
        let result = probe.check(Duration::from_millis(500)).await;
        assert!(!result.success);
    }
}
