//! Client context: who sent a submission, as far as the transport can tell.

use std::net::SocketAddr;

use axum::http::{HeaderMap, Method};

/// Identifier used when no address can be derived.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Transport-level facts about one request, built by the HTTP adapter.
#[derive(Debug, Clone)]
pub struct ClientContext {
    /// HTTP method of the request.
    pub method: Method,
    /// Rate-limit key and stored `ip_address`.
    pub client_id: String,
    /// `User-Agent` header, or `unknown`.
    pub user_agent: String,
}

impl ClientContext {
    /// Build a context from request headers and the raw peer address.
    pub fn from_request(method: Method, headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let user_agent = header_str(headers, "user-agent")
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string();

        Self {
            method,
            client_id: client_id(headers, peer),
            user_agent,
        }
    }

    /// A POST context for tests and non-HTTP callers.
    pub fn post(client_id: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            client_id: client_id.into(),
            user_agent: UNKNOWN_CLIENT.to_string(),
        }
    }
}

/// Derive the client identifier.
///
/// Platform client-IP headers first, then the first `x-forwarded-for` hop,
/// then the socket peer, then [`UNKNOWN_CLIENT`].
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    for name in ["x-nf-client-connection-ip", "client-ip"] {
        if let Some(ip) = header_str(headers, name).map(str::trim).filter(|s| !s.is_empty()) {
            return ip.to_string();
        }
    }

    if let Some(first) = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return first.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
