//! Public address of the calling device

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::handlers::RegistryState;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// The caller's public IP, without the port.
///
/// Taken from the TCP peer address, or from the first `X-Forwarded-For` entry when
/// the service is configured to trust a reverse proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddress(pub IpAddr);

impl fmt::Display for ClientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Rejection when no caller address is available.
#[derive(Debug, Clone, Copy)]
pub struct UnknownRemoteAddress;

impl IntoResponse for UnknownRemoteAddress {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, "ERROR:Unknown remote address").into_response()
    }
}

/// First parseable entry of an `X-Forwarded-For` header.
fn forwarded_for(parts: &Parts) -> Option<IpAddr> {
    let raw = parts.headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    match first.parse::<IpAddr>() {
        Ok(ip) => Some(ip),
        Err(_) => {
            warn!(value = %first, "ignoring unparseable X-Forwarded-For");
            None
        }
    }
}

impl FromRequestParts<Arc<RegistryState>> for ClientAddress {
    type Rejection = UnknownRemoteAddress;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<RegistryState>,
    ) -> Result<Self, Self::Rejection> {
        if state.trust_forwarded_for {
            if let Some(ip) = forwarded_for(parts) {
                return Ok(ClientAddress(ip.to_canonical()));
            }
        }

        let ConnectInfo(peer) = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .map_err(|_| UnknownRemoteAddress)?;
        // IPv4 clients on a dual-stack listener show up as ::ffff:a.b.c.d
        Ok(ClientAddress(peer.ip().to_canonical()))
    }
}
