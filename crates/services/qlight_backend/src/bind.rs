//! Listen address selection

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use qlight_config::ServerConfig;
use tracing::{info, warn};

/// Public address used only to pick the outbound interface; nothing is sent.
const ROUTE_TARGET: &str = "8.8.8.8:80";

/// Address of the interface the host would use to reach the internet.
pub fn detect_outbound_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(ROUTE_TARGET)?;
    Ok(socket.local_addr()?.ip())
}

/// `host:port` to listen on.
///
/// `local` pins loopback, a configured host is used as given, otherwise `detect` picks
/// the outbound interface. Detection failure falls back to loopback.
pub fn resolve_bind_addr(
    server: &ServerConfig,
    detect: impl FnOnce() -> std::io::Result<IpAddr>,
) -> String {
    let loopback = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), server.port);

    if server.local {
        return loopback.to_string();
    }

    let host = server.host.trim();
    if !host.is_empty() {
        return match host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, server.port).to_string(),
            // hostname, resolved by the listener
            Err(_) => format!("{}:{}", host, server.port),
        };
    }

    match detect() {
        Ok(ip) => {
            info!(%ip, "detected outbound interface");
            SocketAddr::new(ip, server.port).to_string()
        }
        Err(err) => {
            warn!(error = %err, "no outbound interface found, serving on loopback only");
            loopback.to_string()
        }
    }
}
