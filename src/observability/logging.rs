//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Emit one access log event per request
//!
//! # Design Decisions
//! - JSON format for release, pretty format for debug and test
//! - Log level configurable via `RUST_LOG`

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Mode;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::Diagnostics;

const DEFAULT_FILTER: &str = "axman=debug,tower_http=debug";

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init(mode: Mode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = match mode {
        Mode::Release => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        Mode::Debug | Mode::Test => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Per-request access log.
pub async fn access_log(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let res = next.run(req).await;

    let status = res.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    let request_id = res
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    match res.extensions().get::<Diagnostics>() {
        Some(diagnostics) if !diagnostics.errors.is_empty() => tracing::warn!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            request_id = %request_id,
            caller = %diagnostics.caller,
            errors = ?diagnostics.errors,
            "Request completed with reply errors"
        ),
        Some(diagnostics) => tracing::info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            request_id = %request_id,
            caller = %diagnostics.caller,
            "Request completed"
        ),
        None => tracing::info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            request_id = %request_id,
            "Request completed"
        ),
    }

    res
}
