//! HTTP surface: engine builder, middleware, and reply envelope.
//!
//! # Data Flow
//! ```text
//! Options
//!     → server.rs (Engine::new: mode, validations, middleware selection)
//!     → routes registered through Engine::handle / Engine::route
//!     → Engine::into_router (middleware applied around every route)
//!
//! Request
//!     → middleware/ (access log, recovery, compression, location)
//!     → request.rs (X-Request-ID reuse or mint)
//!     → middleware/ (CORS, context metadata)
//!     → handler (Context, Valid<T>)
//!     → response.rs (envelope, payload merge, redirect)
//! ```

pub mod context;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use context::{Context, ContextMetadata};
pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use response::{Diagnostics, Reply, ReplyError, Response, REDIRECT_PARAM};
pub use server::Engine;
