//! Live socket round trip through `Engine::serve`.

use std::time::Duration;

use axum::routing::MethodFilter;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;

use axman::config::Options;
use axman::{Context, Engine, Response, Shutdown};

#[derive(Serialize)]
struct Hello {
    #[serde(flatten)]
    response: Response,
    message: String,
}

async fn hello(ctx: Context) -> axum::response::Response {
    let res = Hello {
        response: Response::ok(),
        message: "Hello there".into(),
    };
    res.response.reply(&ctx).with(&res).await
}

#[tokio::test]
async fn serves_until_shutdown() {
    let options = Options {
        mode: "test".into(),
        enable_request_id: true,
        enable_logging: true,
        ..Options::default()
    };
    let engine = Engine::new(options)
        .unwrap()
        .handle(MethodFilter::GET, "/", hello);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = tokio::spawn(engine.serve(listener, shutdown.subscribe()));

    let res = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 200);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["message"], "Hello there");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
