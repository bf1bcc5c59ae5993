//! Reply envelope through a built engine.

mod common;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::MethodFilter,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use axman::config::Options;
use axman::validation::{FieldRule, Valid, Validate};
use axman::{Context, Engine, Response};

use common::{body_json, request};

#[derive(Deserialize)]
struct Req {
    #[serde(default)]
    foo: String,
}

impl Validate for Req {
    const RULES: &'static [FieldRule] = &[];
}

#[derive(Serialize)]
struct Res {
    #[serde(flatten)]
    response: Response,
    #[serde(skip_serializing_if = "String::is_empty")]
    bar: String,
}

async fn handler(ctx: Context, Valid(req): Valid<Req>) -> impl IntoResponse {
    if req.foo.is_empty() {
        return Response::error(400, "invalid Foo").reply(&ctx).await;
    }
    let res = Res {
        response: Response::ok(),
        bar: req.foo,
    };
    res.response.reply(&ctx).with(&res).await
}

fn router() -> axum::Router {
    let options = Options {
        mode: "test".into(),
        enable_request_id: true,
        ..Options::default()
    };
    Engine::new(options)
        .unwrap()
        .handle(MethodFilter::POST, "/test", handler)
        .into_router()
}

#[tokio::test]
async fn replies_merge_payload_fields() {
    let res = request(router(), "POST", "/test", &json!({"foo": "bar"})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body, json!({"code": 200, "status": "OK", "bar": "bar"}));
}

#[tokio::test]
async fn replies_carry_error_text() {
    let res = request(router(), "POST", "/test", &json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], 400);
    assert_eq!(body["status"], "Bad Request");
    assert_eq!(body["error"], "invalid Foo");
}

#[tokio::test]
async fn malformed_body_is_a_bad_request_envelope() {
    let res = request(router(), "POST", "/test", &json!("not an object")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn invalid_codes_are_sent_as_500() {
    let router = Engine::new(Options {
        mode: "test".into(),
        ..Options::default()
    })
    .unwrap()
    .handle(MethodFilter::POST, "/", |ctx: Context| async move {
        Response::new(42).reply(&ctx).await
    })
    .into_router();

    let res = request(router, "POST", "/", &Value::Null).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    assert_eq!(body, json!({"code": 42}));
}

#[tokio::test]
async fn redirect_carries_encoded_envelope() {
    let router = Engine::new(Options {
        mode: "test".into(),
        ..Options::default()
    })
    .unwrap()
    .handle(MethodFilter::POST, "/login", |ctx: Context| async move {
        Response::error(401, "login required")
            .with_redirect("https://app.example.com/signin")
            .reply(&ctx)
            .await
    })
    .into_router();

    let res = request(router, "POST", "/login", &Value::Null).await;
    assert_eq!(res.status(), StatusCode::FOUND);

    let location = res.headers()[header::LOCATION].to_str().unwrap().to_string();
    let (target, payload) = location.split_once("?response=").unwrap();
    assert_eq!(target, "https://app.example.com/signin");

    let decoded: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
    assert_eq!(
        decoded,
        json!({"code": 401, "status": "Unauthorized", "error": "login required"})
    );
}
