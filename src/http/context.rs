//! Per-request context.
//!
//! Handlers receive a [`Context`] extractor instead of reaching into request
//! extensions by key. It carries what the optional middleware resolved for
//! the request and is what [`Response::reply`](crate::http::Response::reply)
//! reads its diagnostics from.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::Value;

use crate::http::middleware::location::Location;
use crate::http::request::X_REQUEST_ID;

/// Engine-wide key/value pairs shared by every request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextMetadata(Arc<BTreeMap<String, Value>>);

impl ContextMetadata {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self(Arc::new(values))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What the engine knows about the current request.
#[derive(Debug, Clone, Default)]
pub struct Context {
    request_id: Option<String>,
    metadata: ContextMetadata,
    location: Option<Location>,
}

impl Context {
    /// Collect the context from request parts.
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Self {
            request_id,
            metadata: parts.extensions.get::<ContextMetadata>().cloned().unwrap_or_default(),
            location: parts.extensions.get::<Location>().cloned(),
        }
    }

    /// Inbound `X-Request-ID`, as rewritten by the request ID middleware when enabled.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn metadata(&self) -> &ContextMetadata {
        &self.metadata
    }

    /// Shorthand for `metadata().get(key)`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set when location detection is enabled.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
