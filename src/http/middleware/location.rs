//! Client location detection.
//!
//! Resolves the scheme and host the client used to reach the server, taking
//! reverse-proxy headers into account, and stores the result as a
//! [`Location`] request extension.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use url::Url;

use crate::config::LocationConfig;

/// Where the client believes the server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location(pub Url);

impl Location {
    pub fn url(&self) -> &Url {
        &self.0
    }
}

pub async fn location_middleware(
    State(config): State<LocationConfig>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match resolve(&config, &req) {
        Some(location) => {
            req.extensions_mut().insert(location);
        }
        None => {
            tracing::debug!(uri = %req.uri(), "Could not resolve client location");
        }
    }
    next.run(req).await
}

fn resolve<B>(config: &LocationConfig, req: &Request<B>) -> Option<Location> {
    let scheme = resolve_scheme(config, req);
    let host = resolve_host(config, req);
    Url::parse(&format!("{}://{}{}", scheme, host, config.base))
        .or_else(|_| {
            Url::parse(&format!("{}://{}{}", config.scheme, config.host, config.base))
        })
        .ok()
        .map(Location)
}

fn resolve_scheme<'a, B>(config: &'a LocationConfig, req: &Request<B>) -> &'a str {
    let forwarded_https = header_str(req.headers(), "x-forwarded-proto")
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
    let uri_https = req.uri().scheme_str() == Some("https");
    if forwarded_https || uri_https {
        "https"
    } else {
        &config.scheme
    }
}

fn resolve_host<B>(config: &LocationConfig, req: &Request<B>) -> String {
    let headers = req.headers();
    header_str(headers, "x-forwarded-host")
        .or_else(|| header_str(headers, "x-host"))
        .or_else(|| header_str(headers, header::HOST.as_str()))
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_else(|| config.host.clone())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
