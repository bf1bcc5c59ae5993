//! Panic recovery.

use std::any::Any;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::http::response::Response as Envelope;

/// Layer that turns a handler panic into a 500 envelope.
pub fn layer() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(recover as fn(Box<dyn Any + Send + 'static>) -> Response)
}

fn recover(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %message, "Handler panicked");

    let envelope = Envelope::new(500);
    (envelope.status_code(), Json(envelope.envelope())).into_response()
}
