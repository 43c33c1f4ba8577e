use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::{Result, RuntimeError};
use crate::probe::{Probe, ProbeResult};

/// `GET http://<ip>:<port><path>`. Success on 2xx/3xx.
pub struct HttpProbe {
    ip: IpAddr,
    port: u16,
    path: String,
}

impl HttpProbe {
    /// Validates the target at construction time: only private/loopback
    /// addresses, a leading-`/` path free of control characters and
    /// traversal, and a non-zero port.
    pub fn new(ip: IpAddr, port: u16, path: impl Into<String>) -> Result<Self> {
        let path = path.into();

        if port == 0 {
            return Err(RuntimeError::invalid_probe_target("port must be in 1..=65535"));
        }
        if !path.starts_with('/') {
            return Err(RuntimeError::invalid_probe_target("path must start with '/'"));
        }
        if path.bytes().any(|b| b == 0 || b == b'\r' || b == b'\n') {
            return Err(RuntimeError::invalid_probe_target(
                "path must not contain NUL, CR, or LF",
            ));
        }
        if path.starts_with("/..") || path.ends_with("/..") {
            return Err(RuntimeError::invalid_probe_target("path traversal is not permitted"));
        }
        if !is_private_or_loopback(&ip) {
            return Err(RuntimeError::invalid_probe_target(format!(
                "probe target {ip} is not a private or loopback address"
            )));
        }

        Ok(Self { ip, port, path })
    }
}

fn is_private_or_loopback(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4) || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback() || is_unique_local_v6(v6),
    }
}

fn is_private_v4(v4: &Ipv4Addr) -> bool {
    v4.is_private()
}

fn is_unique_local_v6(v6: &Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xfe00) == 0xfc00
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        let url = format!("http://{}:{}{}", self.ip, self.port, self.path);

        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(c) => c,
            Err(e) => {
                return ProbeResult::failure(format!("failed to build http client: {e}"), start.elapsed())
            }
        };

        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
                ProbeResult::success(start.elapsed())
            }
            Ok(resp) => {
                ProbeResult::failure(format!("http probe returned status {}", resp.status()), start.elapsed())
            }
            Err(e) => ProbeResult::failure(format!("http probe failed: {e}"), start.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_public_address() {
        let result = HttpProbe::new("8.8.8.8".parse().unwrap(), 80, "/healthz");
        assert!(matches!(result, Err(RuntimeError::InvalidProbeTarget { .. })));
    }

    #[test]
    fn test_rejects_missing_leading_slash() {
        let result = HttpProbe::new("127.0.0.1".parse().unwrap(), 80, "healthz");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_path_traversal() {
        assert!(HttpProbe::new("127.0.0.1".parse().unwrap(), 80, "/../etc/passwd").is_err());
        assert!(HttpProbe::new("127.0.0.1".parse().unwrap(), 80, "/foo/..").is_err());
    }

    #[test]
    fn test_rejects_control_characters() {
        let path = "/foo\r\nbar";
        assert!(HttpProbe::new("127.0.0.1".parse().unwrap(), 80, path).is_err());
    }

    #[test]
    fn test_rejects_zero_port() {
        assert!(HttpProbe::new("127.0.0.1".parse().unwrap(), 0, "/healthz").is_err());
    }

    #[test]
    fn test_accepts_loopback_and_private() {
        assert!(HttpProbe::new("127.0.0.1".parse().unwrap(), 8080, "/healthz").is_ok());
        assert!(HttpProbe::new("10.0.0.5".parse().unwrap(), 8080, "/healthz").is_ok());
        assert!(HttpProbe::new("172.18.0.2".parse().unwrap(), 8080, "/healthz").is_ok());
    }

    #[tokio::test]
    async fn test_check_succeeds_against_local_listener() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                use tokio::io::{AsyncReadExt, AsyncWriteExt};
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
            }
        });

        let probe = HttpProbe::new(addr.ip(), addr.port(), "/healthz").unwrap();
        let result = probe.check(Duration::from_secs(2)).await;
        assert!(result.success, "expected success, got {:?}", result.message);
    }
}
