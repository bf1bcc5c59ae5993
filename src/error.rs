//! Build-time errors.

use thiserror::Error;

use crate::http::middleware::cors::CorsError;

/// Errors returned by [`Engine::new`](crate::http::Engine::new).
///
/// A failed build never yields a partially configured engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine's own wiring is inconsistent (e.g. the validator handle
    /// is not a [`ValidatorEngine`](crate::validation::ValidatorEngine)).
    #[error("{0}")]
    Internal(String),

    /// The supplied CORS policy was rejected.
    #[error(transparent)]
    Cors(#[from] CorsError),
}

/// Result type for engine construction.
pub type EngineResult<T> = Result<T, EngineError>;
