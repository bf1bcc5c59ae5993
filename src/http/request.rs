//! Request ID propagation.
//!
//! # Responsibilities
//! - Reuse an inbound `X-Request-ID` when it is a valid UUID
//! - Mint a UUID v4 otherwise
//! - Expose the resolved ID to handlers (request header + extension)
//! - Echo it on every response
//!
//! # Design Decisions
//! - A valid inbound value is echoed byte-for-byte, not re-formatted
//! - An invalid inbound value is overwritten in the request as well, so
//!   handlers and logs never see an ID the client did not get back

use std::fmt;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};
use uuid::Uuid;

/// Request ID header name.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation identifier for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Mint a fresh random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse any UUID text form (hyphenated, simple, braced, urn).
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Hyphenated lowercase header value.
    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.0.hyphenated().to_string())
            .expect("hyphenated uuid is a valid header value")
    }

    /// Resolve the ID for a request: the inbound header if valid, else a new one.
    ///
    /// Returns the header value to propagate alongside the parsed ID.
    pub fn resolve(headers: &HeaderMap) -> (Self, HeaderValue) {
        if let Some(value) = headers.get(X_REQUEST_ID) {
            if let Some(id) = value.to_str().ok().and_then(Self::parse) {
                return (id, value.clone());
            }
        }
        let id = Self::new();
        (id, id.header_value())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Access to the resolved request ID.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<RequestId> {
        self.extensions().get::<RequestId>().copied()
    }
}

impl RequestIdExt for axum::http::request::Parts {
    fn request_id(&self) -> Option<RequestId> {
        self.extensions.get::<RequestId>().copied()
    }
}

/// Layer installing [`RequestIdService`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Reuses or mints `X-Request-ID` and echoes it on the response.
#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let (id, value) = RequestId::resolve(req.headers());
        req.headers_mut().insert(X_REQUEST_ID, value.clone());
        req.extensions_mut().insert(id);

        let fut = self.inner.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            res.headers_mut().insert(X_REQUEST_ID, value);
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mints_when_missing() {
        let (id, value) = RequestId::resolve(&HeaderMap::new());
        assert_eq!(value.to_str().unwrap(), id.to_string());
        assert!(RequestId::parse(value.to_str().unwrap()).is_some());
    }

    #[test]
    fn reuses_valid_inbound_value_verbatim() {
        let mut headers = HeaderMap::new();
        let inbound = "8F9C1E2A-5B6D-4E7F-8A9B-0C1D2E3F4A5B";
        headers.insert(X_REQUEST_ID, HeaderValue::from_static(inbound));
        let (id, value) = RequestId::resolve(&headers);
        assert_eq!(value, inbound);
        assert_eq!(id.to_string(), inbound.to_lowercase());
    }

    #[test]
    fn replaces_invalid_inbound_value() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("not-a-uuid"));
        let (_, value) = RequestId::resolve(&headers);
        assert_ne!(value, "not-a-uuid");
        assert!(RequestId::parse(value.to_str().unwrap()).is_some());
    }
}
