//! axman demo server.
//!
//! Builds an engine from a TOML options file (or built-in defaults),
//! registers `GET /`, and serves until Ctrl+C or SIGTERM.

use std::path::PathBuf;

use axum::{response::IntoResponse, routing::MethodFilter};
use clap::Parser;
use serde::Serialize;
use serde_json::json;

use axman::config::{load_options, Options};
use axman::observability::logging;
use axman::{Context, Engine, Response};

const ADDRESS_ENV: &str = "APP_SERVER_ADDRESS";
const DEFAULT_ADDRESS: &str = "localhost:8080";

#[derive(Debug, Parser)]
#[command(name = "axman", version, about = "axman demo server")]
struct Cli {
    /// TOML options file. Built-in demo options are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address. Falls back to APP_SERVER_ADDRESS, then localhost:8080.
    #[arg(short, long)]
    address: Option<String>,
}

#[derive(Serialize)]
struct GetRes {
    #[serde(flatten)]
    response: Response,
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
}

async fn hello(ctx: Context) -> impl IntoResponse {
    let res = GetRes {
        response: Response::ok(),
        message: "Hello there".to_string(),
    };
    res.response.reply(&ctx).with(&res).await
}

fn demo_options() -> Options {
    Options {
        context_metadata: [("env".to_string(), json!("dev"))].into_iter().collect(),
        enable_compression: true,
        enable_location: true,
        enable_recovery: true,
        enable_request_id: true,
        enable_logging: true,
        mode: "dev".to_string(),
        validations: vec!["base64Any".into(), "duration".into(), "json".into()],
        ..Options::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => load_options(path)?,
        None => demo_options(),
    };
    logging::init(options.resolved_mode());

    tracing::info!(options = ?options, "Configuration loaded");

    let engine = Engine::new(options)?.handle(MethodFilter::GET, "/", hello);

    let address = cli
        .address
        .or_else(|| std::env::var(ADDRESS_ENV).ok())
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
    tracing::info!(address = %address, "Listening for requests");

    engine.run(address.as_str()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
