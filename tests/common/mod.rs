//! Shared helpers for integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Send a JSON request through the router.
pub async fn request(router: Router, method: &str, path: &str, body: &Value) -> Response {
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    router.oneshot(req).await.unwrap()
}

/// Send a prepared request through the router.
pub async fn send(router: Router, req: Request<Body>) -> Response {
    router.oneshot(req).await.unwrap()
}

pub async fn body_bytes(res: Response) -> Vec<u8> {
    res.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(res: Response) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

pub async fn body_string(res: Response) -> String {
    String::from_utf8(body_bytes(res).await).unwrap()
}
