//! CORS policy.
//!
//! # Responsibilities
//! - Describe the policy declaratively (deserializable except the origin predicate)
//! - Detect whether the policy differs from the all-default value
//! - Reject conflicting settings before any layer is built
//! - Translate the policy into a `tower_http` `CorsLayer`
//!
//! # Design Decisions
//! - Validation messages are stable strings; the engine passes them through verbatim
//! - With credentials a literal `*` is not permitted, so "all origins",
//!   `*` methods and `*` headers mirror the request instead; `*` expose
//!   headers cannot be mirrored and are rejected

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use serde::Deserialize;
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

/// Origin predicate used in addition to the static origin list.
pub type OriginPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

const DEFAULT_SCHEMAS: &[&str] = &["http://", "https://"];
const EXTENSION_SCHEMAS: &[&str] = &[
    "chrome-extension://",
    "safari-extension://",
    "moz-extension://",
    "ms-browser-extension://",
];
const WEBSOCKET_SCHEMAS: &[&str] = &["ws://", "wss://"];
const FILE_SCHEMAS: &[&str] = &["file://"];
const WILDCARD: &str = "*";

/// CORS policy errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsError {
    #[error("conflict settings: all origins enabled. AllowOriginFunc or AllowOrigins is not needed")]
    AllOriginsEnabled,

    #[error("conflict settings: all origins disabled")]
    AllOriginsDisabled,

    #[error("bad origin: origins must contain '*' or include {schemas}")]
    BadOrigin { schemas: String },

    #[error("only one * is allowed")]
    WildcardCount,

    #[error("invalid method '{0}'")]
    InvalidMethod(String),

    #[error("invalid header name '{0}'")]
    InvalidHeader(String),

    #[error("conflict settings: expose headers '*' cannot be combined with credentials")]
    WildcardExposeWithCredentials,
}

/// Cross-origin resource sharing policy.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allow every origin.
    pub allow_all_origins: bool,

    /// Allowed origins (`http://example.com`); may contain one `*` when
    /// `allow_wildcard` is set.
    pub allow_origins: Vec<String>,

    /// Extra predicate consulted for origins not in `allow_origins`.
    #[serde(skip)]
    pub allow_origin_func: Option<OriginPredicate>,

    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    pub expose_headers: Vec<String>,

    /// Preflight cache lifetime; 0 leaves the header out.
    pub max_age_secs: u64,

    pub allow_wildcard: bool,
    pub allow_browser_extensions: bool,
    pub allow_websockets: bool,
    pub allow_files: bool,
}

impl CorsConfig {
    /// The conventional starting point: common methods and headers, 12h max age, no origins.
    pub fn default_policy() -> Self {
        Self {
            allow_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allow_headers: ["Origin", "Content-Length", "Content-Type"]
                .map(String::from)
                .to_vec(),
            max_age_secs: 12 * 60 * 60,
            ..Self::default()
        }
    }

    /// Whether any field differs from its default.
    pub fn is_configured(&self) -> bool {
        self.allow_all_origins
            || !self.allow_origins.is_empty()
            || self.allow_origin_func.is_some()
            || !self.allow_methods.is_empty()
            || !self.allow_headers.is_empty()
            || self.allow_credentials
            || !self.expose_headers.is_empty()
            || self.max_age_secs != 0
            || self.allow_wildcard
            || self.allow_browser_extensions
            || self.allow_websockets
            || self.allow_files
    }

    /// Origin schemas accepted for entries without a `*`.
    pub fn allowed_schemas(&self) -> Vec<&'static str> {
        let mut schemas = DEFAULT_SCHEMAS.to_vec();
        if self.allow_browser_extensions {
            schemas.extend_from_slice(EXTENSION_SCHEMAS);
        }
        if self.allow_websockets {
            schemas.extend_from_slice(WEBSOCKET_SCHEMAS);
        }
        if self.allow_files {
            schemas.extend_from_slice(FILE_SCHEMAS);
        }
        schemas
    }

    /// Check the policy for conflicting or malformed settings.
    pub fn validate(&self) -> Result<(), CorsError> {
        let has_origin_fn = self.allow_origin_func.is_some();
        if self.allow_all_origins && (has_origin_fn || !self.allow_origins.is_empty()) {
            return Err(CorsError::AllOriginsEnabled);
        }
        if !self.allow_all_origins && !has_origin_fn && self.allow_origins.is_empty() {
            return Err(CorsError::AllOriginsDisabled);
        }

        let schemas = self.allowed_schemas();
        for origin in &self.allow_origins {
            if origin.contains('*') {
                if self.allow_wildcard && origin.matches('*').count() > 1 {
                    return Err(CorsError::WildcardCount);
                }
                continue;
            }
            if !schemas.iter().any(|s| origin.starts_with(s)) {
                return Err(CorsError::BadOrigin {
                    schemas: schemas.join(","),
                });
            }
        }

        if self.allow_credentials && has_wildcard(&self.expose_headers) {
            return Err(CorsError::WildcardExposeWithCredentials);
        }

        self.methods()?;
        parse_headers(&self.allow_headers)?;
        parse_headers(&self.expose_headers)?;
        Ok(())
    }

    /// Build the layer. Call [`validate`](Self::validate) first; origin
    /// conflicts are not re-checked here.
    pub fn to_layer(&self) -> Result<CorsLayer, CorsError> {
        let mut layer = CorsLayer::new()
            .allow_origin(self.allow_origin())
            .allow_methods(self.allow_methods()?)
            .allow_headers(self.allow_headers()?)
            .expose_headers(self.expose_headers()?)
            .allow_credentials(self.allow_credentials);
        if self.max_age_secs > 0 {
            layer = layer.max_age(Duration::from_secs(self.max_age_secs));
        }
        Ok(layer)
    }

    fn methods(&self) -> Result<Vec<Method>, CorsError> {
        self.allow_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| CorsError::InvalidMethod(m.clone()))
            })
            .collect()
    }

    fn allow_methods(&self) -> Result<AllowMethods, CorsError> {
        if has_wildcard(&self.allow_methods) {
            return Ok(if self.allow_credentials {
                AllowMethods::mirror_request()
            } else {
                AllowMethods::any()
            });
        }
        Ok(AllowMethods::list(self.methods()?))
    }

    fn allow_headers(&self) -> Result<AllowHeaders, CorsError> {
        if has_wildcard(&self.allow_headers) {
            return Ok(if self.allow_credentials {
                AllowHeaders::mirror_request()
            } else {
                AllowHeaders::any()
            });
        }
        Ok(AllowHeaders::list(parse_headers(&self.allow_headers)?))
    }

    fn expose_headers(&self) -> Result<ExposeHeaders, CorsError> {
        if has_wildcard(&self.expose_headers) {
            if self.allow_credentials {
                return Err(CorsError::WildcardExposeWithCredentials);
            }
            return Ok(ExposeHeaders::any());
        }
        Ok(ExposeHeaders::list(parse_headers(&self.expose_headers)?))
    }

    fn allow_origin(&self) -> AllowOrigin {
        if self.allow_all_origins || has_wildcard(&self.allow_origins) {
            return if self.allow_credentials {
                AllowOrigin::mirror_request()
            } else {
                AllowOrigin::any()
            };
        }
        let matcher = OriginMatcher::new(self);
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(|o| matcher.matches(o))
        })
    }
}

impl fmt::Debug for CorsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorsConfig")
            .field("allow_all_origins", &self.allow_all_origins)
            .field("allow_origins", &self.allow_origins)
            .field("allow_origin_func", &self.allow_origin_func.is_some())
            .field("allow_methods", &self.allow_methods)
            .field("allow_headers", &self.allow_headers)
            .field("allow_credentials", &self.allow_credentials)
            .field("expose_headers", &self.expose_headers)
            .field("max_age_secs", &self.max_age_secs)
            .field("allow_wildcard", &self.allow_wildcard)
            .field("allow_browser_extensions", &self.allow_browser_extensions)
            .field("allow_websockets", &self.allow_websockets)
            .field("allow_files", &self.allow_files)
            .finish()
    }
}

fn has_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v.trim() == WILDCARD)
}

fn parse_headers(names: &[String]) -> Result<Vec<HeaderName>, CorsError> {
    names
        .iter()
        .map(|h| {
            HeaderName::from_bytes(h.trim().as_bytes())
                .map_err(|_| CorsError::InvalidHeader(h.clone()))
        })
        .collect()
}

/// Origin matching for policies without "allow all".
struct OriginMatcher {
    exact: Vec<String>,
    /// (prefix, suffix) around a single `*`.
    wildcards: Vec<(String, String)>,
    func: Option<OriginPredicate>,
}

impl OriginMatcher {
    fn new(config: &CorsConfig) -> Self {
        let mut exact = Vec::new();
        let mut wildcards = Vec::new();
        for origin in &config.allow_origins {
            match origin.split_once('*') {
                Some((prefix, suffix)) if config.allow_wildcard => {
                    wildcards.push((prefix.to_string(), suffix.to_string()));
                }
                _ => exact.push(origin.clone()),
            }
        }
        Self {
            exact,
            wildcards,
            func: config.allow_origin_func.clone(),
        }
    }

    fn matches(&self, origin: &str) -> bool {
        self.exact.iter().any(|o| o == origin)
            || self.wildcards.iter().any(|(prefix, suffix)| {
                origin.len() >= prefix.len() + suffix.len()
                    && origin.starts_with(prefix.as_str())
                    && origin.ends_with(suffix.as_str())
            })
            || self.func.as_ref().is_some_and(|f| f(origin))
    }
}
