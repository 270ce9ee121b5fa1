//! Listener setup with sequential port fallback.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::error::{RelayError, RelayResult};

const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Join host and port into a bindable address. IP literals (including IPv6,
/// which needs brackets) go through `SocketAddr`; hostnames are left for the
/// resolver.
pub fn listen_addr(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{}:{}", host, port),
    }
}

/// Bind `host:preferred_port`, moving to the next port while the current one
/// is in use, for at most `max_attempts` ports in total.
///
/// Any bind failure other than "address in use" is returned immediately.
pub async fn bind_with_retry(
    host: &str,
    preferred_port: u16,
    max_attempts: u32,
) -> RelayResult<TcpListener> {
    let mut port = preferred_port;
    let mut attempt = 1;

    loop {
        let addr = listen_addr(host, port);
        match TcpListener::bind(&addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                if attempt >= max_attempts || port == u16::MAX {
                    return Err(RelayError::PortUnavailable {
                        first: preferred_port,
                        last: port,
                    });
                }
                tracing::warn!("Port {} in use, trying {}...", port, port + 1);
                port += 1;
                attempt += 1;
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(source) => return Err(RelayError::Bind { addr, source }),
        }
    }
}
