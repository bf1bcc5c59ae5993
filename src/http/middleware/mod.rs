//! Optional middleware attached by the engine builder.
//!
//! Outermost to innermost: access log → recovery → compression → location →
//! request ID → CORS → context metadata → handler.

pub mod cors;
pub mod location;
pub mod metadata;
pub mod recovery;

pub use cors::{CorsConfig, CorsError};
pub use location::Location;
