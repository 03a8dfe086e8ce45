//! Caller IP extraction.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Placeholder used when no address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// The caller's IP as best determined from proxy headers and the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(resolve_client_ip(&parts.headers, peer)))
    }
}

fn usable(candidate: &str) -> bool {
    !candidate.is_empty() && !candidate.eq_ignore_ascii_case(UNKNOWN_IP)
}

/// First usable `X-Forwarded-For` entry, then `X-Real-IP`, then the peer.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(ip) = forwarded.split(',').map(str::trim).find(|ip| usable(ip)) {
            return ip.to_string();
        }
    }

    if let Some(real_ip) = header("x-real-ip").map(str::trim).filter(|ip| usable(ip)) {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}
