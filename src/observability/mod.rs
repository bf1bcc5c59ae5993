//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     → logging::init (subscriber, filter, output format by mode)
//!
//! Per request (when enable_logging is set):
//!     → logging::access_log (method, path, status, latency, request ID)
//!     → reply Diagnostics attached by the handler (caller, merge errors)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) in release mode, pretty output otherwise
//! - Request ID flows into every access log line

pub mod logging;
