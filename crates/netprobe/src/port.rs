//! Single-probe TCP/UDP port checks.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

/// Timeout applied to each port probe
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Payload sent to UDP ports
const UDP_PROBE: &[u8] = b"ping";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(format!("Invalid protocol: {other}")),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Outcome of a port probe. Failures are statuses, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "closed (timeout)")]
    Timeout,
    #[serde(rename = "closed (error)")]
    Error,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Open => write!(f, "open"),
            PortStatus::Closed => write!(f, "closed"),
            PortStatus::Timeout => write!(f, "closed (timeout)"),
            PortStatus::Error => write!(f, "closed (error)"),
        }
    }
}

/// Result of checking one port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCheck {
    pub ip: String,
    pub port: u16,
    pub protocol: Protocol,
    pub status: PortStatus,
}

/// Probes a single port on a host
#[async_trait::async_trait]
pub trait PortChecker: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> PortStatus;
}

/// TCP connect checker
pub struct TcpPortChecker {
    timeout_duration: Duration,
}

impl TcpPortChecker {
    pub fn new(timeout_duration: Duration) -> Self {
        Self { timeout_duration }
    }
}

#[async_trait::async_trait]
impl PortChecker for TcpPortChecker {
    async fn probe(&self, host: &str, port: u16) -> PortStatus {
        match timeout(self.timeout_duration, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => PortStatus::Open,
            Ok(Err(error)) => {
                debug!(host, port, %error, "TCP connect failed");
                PortStatus::Closed
            }
            Err(_) => PortStatus::Timeout,
        }
    }
}

/// UDP checker: a port is open if anything answers the probe datagram
pub struct UdpPortChecker {
    timeout_duration: Duration,
}

impl UdpPortChecker {
    pub fn new(timeout_duration: Duration) -> Self {
        Self { timeout_duration }
    }
}

#[async_trait::async_trait]
impl PortChecker for UdpPortChecker {
    async fn probe(&self, host: &str, port: u16) -> PortStatus {
        let socket = match UdpSocket::bind(("0.0.0.0", 0)).await {
            Ok(socket) => socket,
            Err(error) => {
                debug!(%error, "Failed to bind UDP socket");
                return PortStatus::Error;
            }
        };

        if let Err(error) = socket.send_to(UDP_PROBE, (host, port)).await {
            debug!(host, port, %error, "UDP send failed");
            return PortStatus::Error;
        }

        let mut buf = [0u8; 512];
        match timeout(self.timeout_duration, socket.recv_from(&mut buf)).await {
            Ok(Ok(_)) => PortStatus::Open,
            Ok(Err(error)) => {
                debug!(host, port, %error, "UDP receive failed");
                PortStatus::Error
            }
            Err(_) => PortStatus::Timeout,
        }
    }
}

/// Check `port` on `ip` over `protocol`
pub async fn check_port(ip: &str, port: u16, protocol: Protocol, timeout_duration: Duration) -> PortCheck {
    let checker: Box<dyn PortChecker> = match protocol {
        Protocol::Tcp => Box::new(TcpPortChecker::new(timeout_duration)),
        Protocol::Udp => Box::new(UdpPortChecker::new(timeout_duration)),
    };

    let status = checker.probe(ip, port).await;
    debug!(ip, port, %protocol, %status, "Port check finished");

    PortCheck { ip: ip.to_string(), port, protocol, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("tcp".parse::<Protocol>(), Ok(Protocol::Tcp));
        assert_eq!("udp".parse::<Protocol>(), Ok(Protocol::Udp));
        assert!("icmp".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_status_serialization() {
        let check = PortCheck {
            ip: "127.0.0.1".into(),
            port: 80,
            protocol: Protocol::Tcp,
            status: PortStatus::Timeout,
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["status"], "closed (timeout)");
        assert_eq!(json["protocol"], "tcp");
        assert_eq!(json["port"], 80);
    }

    #[tokio::test]
    async fn test_open_tcp_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let check = check_port("127.0.0.1", port, Protocol::Tcp, DEFAULT_PORT_TIMEOUT).await;
        assert_eq!(check.status, PortStatus::Open);
    }

    #[tokio::test]
    async fn test_closed_tcp_port_within_timeout() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let start = Instant::now();
        let check = check_port("127.0.0.1", port, Protocol::Tcp, DEFAULT_PORT_TIMEOUT).await;
        assert_eq!(check.status, PortStatus::Closed);
        assert!(start.elapsed() <= DEFAULT_PORT_TIMEOUT + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_udp_echo_is_open() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 16];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&buf[..n], peer).await.unwrap();
        });

        let check = check_port("127.0.0.1", port, Protocol::Udp, DEFAULT_PORT_TIMEOUT).await;
        assert_eq!(check.status, PortStatus::Open);
    }

    #[tokio::test]
    async fn test_silent_udp_port_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let check = check_port("127.0.0.1", port, Protocol::Udp, Duration::from_millis(200)).await;
        assert_eq!(check.status, PortStatus::Timeout);
        drop(server);
    }
}
