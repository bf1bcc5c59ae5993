//! Configuration schema definitions.
//!
//! Everything except validator functions and the validator handle can be
//! deserialized; those two are code-only.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Mode;
use crate::http::middleware::cors::CorsConfig;
use crate::validation::{StructValidator, ValidationFn};

/// Options applied by [`Engine::new`](crate::http::Engine::new).
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Key/value pairs made available to every request through [`Context`](crate::http::Context).
    pub context_metadata: BTreeMap<String, serde_json::Value>,

    /// CORS policy. Ignored while it equals the all-default policy.
    pub cors: CorsConfig,

    /// Gzip response compression.
    pub enable_compression: bool,

    /// Client location detection.
    pub enable_location: bool,

    /// Turn handler panics into 500 replies.
    pub enable_recovery: bool,

    /// Reuse or mint `X-Request-ID`.
    pub enable_request_id: bool,

    /// Per-request access log.
    pub enable_logging: bool,

    /// Fallbacks used by location detection.
    pub location: LocationConfig,

    /// Run mode name, see [`Mode::from_name`].
    pub mode: String,

    /// Custom validation functions keyed by tag.
    #[serde(skip)]
    pub validation_funcs: HashMap<String, ValidationFn>,

    /// Built-in validations to enable: `duration`, `json`, `base64Any`.
    pub validations: Vec<String>,

    /// Validator handle to register into. `None` creates a fresh engine.
    #[serde(skip)]
    pub validator: Option<Arc<dyn StructValidator>>,
}

impl Options {
    /// The mode the engine will run in.
    pub fn resolved_mode(&self) -> Mode {
        Mode::resolve(&self.mode)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut funcs: Vec<_> = self.validation_funcs.keys().collect();
        funcs.sort();
        f.debug_struct("Options")
            .field("context_metadata", &self.context_metadata)
            .field("cors", &self.cors)
            .field("enable_compression", &self.enable_compression)
            .field("enable_location", &self.enable_location)
            .field("enable_recovery", &self.enable_recovery)
            .field("enable_request_id", &self.enable_request_id)
            .field("enable_logging", &self.enable_logging)
            .field("location", &self.location)
            .field("mode", &self.mode)
            .field("validation_funcs", &funcs)
            .field("validations", &self.validations)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Location detection fallbacks.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocationConfig {
    /// Scheme used when the request does not prove https.
    pub scheme: String,

    /// Host used when no header or authority names one.
    pub host: String,

    /// Path appended to every detected location.
    pub base: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost:8080".to_string(),
            base: String::new(),
        }
    }
}
