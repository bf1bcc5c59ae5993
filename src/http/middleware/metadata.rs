//! Context metadata injection.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::context::ContextMetadata;

/// Attach the engine-wide metadata to every request.
pub async fn metadata_middleware(
    State(metadata): State<ContextMetadata>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    req.extensions_mut().insert(metadata);
    next.run(req).await
}
