//! Preconfigured Axum engines built from declarative options.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod validation;

pub use config::{Mode, Options};
pub use error::EngineError;
pub use http::{Context, Engine, ReplyError, RequestId, Response};
pub use lifecycle::Shutdown;
pub use validation::{Valid, Validate, ValidatorEngine};
