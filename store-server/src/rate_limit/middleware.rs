//! Rate limit middleware
//!
//! Caller identity is the first public address in `X-Forwarded-For`
//! (proxy-appended private hops are skipped), falling back to the peer
//! address. Rejections carry `Retry-After`.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::net::{IpAddr, SocketAddr};

use crate::core::ServerState;
use crate::utils::error::AppError;

use super::limiter::RateLimitPolicy;

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local(),
    }
}

/// Resolve the caller identity for rate limiting
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        for entry in forwarded.split(',') {
            if let Ok(ip) = entry.trim().parse::<IpAddr>() {
                if !is_private_ip(&ip) {
                    return ip.to_string();
                }
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(
    state: ServerState,
    policy: RateLimitPolicy,
    peer: Option<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = client_identity(req.headers(), peer);
    let decision = state.rate_limiter.check(&identity, &policy);

    if !decision.allowed {
        tracing::warn!(%identity, tier = policy.name, "Rate limit exceeded");
        return Err(AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }
    Ok(next.run(req).await)
}

/// Strict tier: public mutating routes
pub async fn rate_limit_strict(
    State(state): State<ServerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let policy = state.config.rate_limit.strict;
    enforce(state, policy, Some(peer), req, next).await
}

/// Standard tier: remaining public routes
pub async fn rate_limit_standard(
    State(state): State<ServerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let policy = state.config.rate_limit.standard;
    enforce(state, policy, Some(peer), req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer(addr: &str) -> Option<SocketAddr> {
        Some(addr.parse().unwrap())
    }

    #[test]
    fn forwarded_public_address_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(
            client_identity(&headers, peer("10.0.0.2:443")),
            "203.0.113.7"
        );
    }

    #[test]
    fn private_hops_are_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 192.168.1.1, 198.51.100.4"),
        );
        assert_eq!(
            client_identity(&headers, peer("10.0.0.2:443")),
            "198.51.100.4"
        );
    }

    #[test]
    fn falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        assert_eq!(client_identity(&headers, peer("203.0.113.9:51000")), "203.0.113.9");

        let mut only_private = HeaderMap::new();
        only_private.insert("x-forwarded-for", HeaderValue::from_static("127.0.0.1"));
        assert_eq!(
            client_identity(&only_private, peer("203.0.113.9:51000")),
            "203.0.113.9"
        );
    }

    #[test]
    fn garbage_forwarded_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        assert_eq!(client_identity(&headers, peer("203.0.113.9:51000")), "203.0.113.9");
        assert_eq!(client_identity(&headers, None), "unknown");
    }
}
