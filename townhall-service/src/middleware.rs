//! Middleware for client IP injection and per-route outcome counters

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::metrics::{self, Outcome};

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Header or connection the rate-limit key was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpSource {
    Cloudflare,
    ForwardedFor,
    Socket,
}

fn header_ip<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let raw = headers.get(name)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    (!first.is_empty()).then_some(first)
}

/// CF-Connecting-IP, then the first X-Forwarded-For entry, then the peer address
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<(IpSource, String)> {
    if let Some(ip) = header_ip(headers, CF_CONNECTING_IP) {
        return Some((IpSource::Cloudflare, ip.to_string()));
    }
    if let Some(ip) = header_ip(headers, X_FORWARDED_FOR) {
        return Some((IpSource::ForwardedFor, ip.to_string()));
    }
    peer.map(|addr| (IpSource::Socket, addr.ip().to_string()))
}

/// Rewrite X-Forwarded-For to the single resolved client IP.
/// The governor's `SmartIpKeyExtractor` reads that header first, so this decides the bucket.
pub async fn inject_client_ip(mut req: Request<Body>, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match resolve_client_ip(req.headers(), peer) {
        Some((source, ip)) => {
            debug!("client ip {} from {:?}", ip, source);
            if let Ok(value) = HeaderValue::from_str(&ip) {
                req.headers_mut().insert(X_FORWARDED_FOR, value);
            }
        }
        None => debug!("client ip unavailable"),
    }

    next.run(req).await
}

/// Count each response by matched route and outcome.
/// Installed with `route_layer`, so unmatched paths are not counted.
pub async fn track_outcomes(req: Request<Body>, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().clone();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    metrics::record_request(&format!("{} {}", method, route), Outcome::from_status(status));
    debug!("{} {} -> {}", method, route, status);

    response
}
