use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::core::netwatch::PortProbe;

/// Treats a completed TCP handshake as "open".
#[derive(Default)]
pub struct TcpProbe;

fn address(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[async_trait]
impl PortProbe for TcpProbe {
    async fn is_open(&self, host: &str, port: u16, limit: Duration) -> bool {
        let addr = address(host, port);
        match timeout(limit, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                tracing::debug!(%addr, error = %err, "port closed");
                false
            }
            Err(_) => {
                tracing::debug!(%addr, "port probe timed out");
                false
            }
        }
    }
}
