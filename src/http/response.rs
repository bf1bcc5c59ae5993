//! Uniform reply envelope.
//!
//! # Responsibilities
//! - Normalize status code, status text and error into one JSON shape
//! - Merge auxiliary payloads and the envelope into a single object
//! - Optional artificial delay and redirect-with-payload
//! - Leave diagnostics (caller, request ID, merge errors) for the access log
//!
//! # Design Decisions
//! - `reply` borrows the envelope, so it can be embedded (`#[serde(flatten)]`)
//!   in the very payload passed to `with`
//! - Payloads are serialized as they are added; the reply owns plain JSON
//! - Merge failures never fail the request; they become diagnostics
//!
//! ```text
//! {"code": 200, "status": "OK", "error": "...", <payload fields>}
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::future::IntoFuture;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use futures_util::future::BoxFuture;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::http::context::Context;
use crate::validation::BindError;

/// Query parameter carrying the encoded reply on redirects.
pub const REDIRECT_PARAM: &str = "response";

/// Error carried by a reply.
#[derive(Clone, Default)]
pub enum ReplyError {
    #[default]
    Absent,
    Message(String),
    Structured(Arc<dyn StdError + Send + Sync>),
}

impl ReplyError {
    /// Wrap an error value; it is rendered through its `Display` impl.
    pub fn structured<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ReplyError::Structured(Arc::new(err))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ReplyError::Absent)
    }

    fn flatten(&mut self) {
        if let ReplyError::Structured(e) = self {
            *self = ReplyError::Message(e.to_string());
        }
    }
}

impl fmt::Debug for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyError::Absent => f.write_str("Absent"),
            ReplyError::Message(m) => f.debug_tuple("Message").field(m).finish(),
            ReplyError::Structured(e) => f.debug_tuple("Structured").field(&e.to_string()).finish(),
        }
    }
}

impl Serialize for ReplyError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReplyError::Absent => serializer.serialize_none(),
            ReplyError::Message(m) => serializer.serialize_str(m),
            ReplyError::Structured(e) => serializer.collect_str(e),
        }
    }
}

impl From<&str> for ReplyError {
    fn from(message: &str) -> Self {
        ReplyError::Message(message.to_string())
    }
}

impl From<String> for ReplyError {
    fn from(message: String) -> Self {
        ReplyError::Message(message)
    }
}

/// Reply envelope.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Response {
    /// HTTP status code; 0 means "not set" and replies as 500.
    #[serde(skip_serializing_if = "is_zero")]
    pub code: u16,

    /// Derived from `code` when replying.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,

    #[serde(skip_serializing_if = "ReplyError::is_absent")]
    pub error: ReplyError,

    /// Redirect target. The merged reply travels base64url-encoded in the query.
    #[serde(skip)]
    pub redirect: Option<String>,

    /// Delay before the reply is sent.
    #[serde(skip)]
    pub sleep: Duration,
}

fn is_zero(code: &u16) -> bool {
    *code == 0
}

impl Response {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn error(code: u16, err: impl Into<ReplyError>) -> Self {
        Self::new(code).with_error(err)
    }

    pub fn with_error(mut self, err: impl Into<ReplyError>) -> Self {
        self.error = err.into();
        self
    }

    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    pub fn with_sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    /// `code`, or 500 when unset.
    pub fn resolved_code(&self) -> u16 {
        if self.code == 0 {
            StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        } else {
            self.code
        }
    }

    /// Status sent on the wire. Codes outside 100..=999 are sent as 500.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.resolved_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Canonical reason phrase for the resolved code, empty if unknown.
    pub fn status_text(&self) -> &'static str {
        StatusCode::from_u16(self.resolved_code())
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
    }

    fn normalize(&mut self) {
        self.code = self.resolved_code();
        self.status = self.status_text().to_string();
        self.error.flatten();
    }

    /// The normalized envelope as a JSON object.
    pub fn envelope(&self) -> Map<String, Value> {
        let mut normalized = self.clone();
        normalized.normalize();
        match serde_json::to_value(&normalized) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Start a reply. Add payloads with [`Reply::with`], then `.await` it.
    ///
    /// ```no_run
    /// use axman::{Context, Response};
    /// use axum::response::IntoResponse;
    ///
    /// #[derive(serde::Serialize)]
    /// struct Hello {
    ///     #[serde(flatten)]
    ///     response: Response,
    ///     message: String,
    /// }
    ///
    /// async fn hello(ctx: Context) -> impl IntoResponse {
    ///     let res = Hello { response: Response::ok(), message: "Hello there".into() };
    ///     res.response.reply(&ctx).with(&res).await
    /// }
    /// ```
    #[track_caller]
    pub fn reply(&self, ctx: &Context) -> Reply {
        let caller = Location::caller();
        let mut primary = self.clone();
        primary.normalize();

        Reply {
            primary,
            payloads: Vec::new(),
            diagnostics: Diagnostics {
                caller: format!("{}:{}", caller.file(), caller.line()),
                request_id: ctx.request_id().map(str::to_string),
                errors: Vec::new(),
            },
        }
    }
}

/// Reply details kept out of the body, attached to the HTTP response's extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// `file:line` of the `reply` call.
    pub caller: String,
    /// Inbound `X-Request-ID`, if any.
    pub request_id: Option<String>,
    /// Non-fatal problems met while building the reply.
    pub errors: Vec<String>,
}

/// A pending reply. Awaiting it produces the HTTP response.
#[must_use = "a reply does nothing until it is awaited"]
pub struct Reply {
    primary: Response,
    payloads: Vec<Result<Value, String>>,
    diagnostics: Diagnostics,
}

impl Reply {
    /// Add an auxiliary payload. Payloads merge in order, the envelope last.
    pub fn with<T>(mut self, payload: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        self.payloads
            .push(serde_json::to_value(payload).map_err(|e| e.to_string()));
        self
    }

    fn merge(&mut self) -> Map<String, Value> {
        let primary = serde_json::to_value(&self.primary).map_err(|e| e.to_string());
        let payloads = std::mem::take(&mut self.payloads);

        let mut merged = Map::new();
        for payload in payloads.into_iter().chain(std::iter::once(primary)) {
            match payload {
                Ok(Value::Object(fields)) => merged.extend(fields),
                Ok(other) => self.diagnostics.errors.push(format!(
                    "couldn't merge reply responses: expected an object, got {}",
                    json_kind(&other)
                )),
                Err(e) => self
                    .diagnostics
                    .errors
                    .push(format!("couldn't merge reply responses: {}", e)),
            }
        }
        merged
    }

    /// Build the response, sleeping first if requested.
    pub async fn send(mut self) -> axum::response::Response {
        let merged = self.merge();

        if !self.primary.sleep.is_zero() {
            tokio::time::sleep(self.primary.sleep).await;
        }

        let mut response = match self.primary.redirect.take() {
            Some(target) => redirect(&target, &merged, &mut self.diagnostics),
            None => (self.primary.status_code(), Json(merged)).into_response(),
        };
        response.extensions_mut().insert(self.diagnostics);
        response
    }
}

impl IntoFuture for Reply {
    type Output = axum::response::Response;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.send())
    }
}

fn redirect(
    target: &str,
    merged: &Map<String, Value>,
    diagnostics: &mut Diagnostics,
) -> axum::response::Response {
    let location = match serde_json::to_vec(merged) {
        Ok(body) => format!("{}?{}={}", target, REDIRECT_PARAM, URL_SAFE_NO_PAD.encode(body)),
        Err(e) => {
            diagnostics
                .errors
                .push(format!("couldn't encode redirect response: {}", e));
            target.to_string()
        }
    };

    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            diagnostics
                .errors
                .push(format!("invalid redirect target '{}'", target));
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl IntoResponse for BindError {
    fn into_response(self) -> axum::response::Response {
        let code = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self, "Request binding failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let envelope = Response::error(code.as_u16(), ReplyError::structured(self));
        (envelope.status_code(), Json(envelope.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::time::Instant;

    #[derive(Serialize)]
    struct Res {
        #[serde(flatten)]
        response: Response,
        #[serde(skip_serializing_if = "String::is_empty")]
        bar: String,
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn zero_code_defaults_to_500() {
        let envelope = Response::default().envelope();
        assert_eq!(envelope["code"], 500);
        assert_eq!(envelope["status"], "Internal Server Error");
        assert!(!envelope.contains_key("error"));
    }

    #[test]
    fn status_text_follows_code() {
        let mut res = Response::new(404);
        res.status = "Stale".into();
        assert_eq!(res.envelope()["status"], "Not Found");
        assert_eq!(Response::new(599).status_text(), "");
        assert_eq!(Response::new(42).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn structured_errors_flatten_to_strings() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let envelope = Response::error(503, ReplyError::structured(err)).envelope();
        assert_eq!(envelope["error"], "disk on fire");
        assert_eq!(Response::error(400, "invalid Foo").envelope()["error"], "invalid Foo");
    }

    #[tokio::test]
    async fn merges_payloads_before_envelope() {
        let res = Res {
            response: Response::ok(),
            bar: "x".into(),
        };
        let reply = res.response.reply(&Context::default()).with(&res).await;
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(
            body_json(reply).await,
            json!({"code": 200, "status": "OK", "bar": "x"})
        );
    }

    #[tokio::test]
    async fn later_payloads_override_earlier_keys() {
        let reply = Response::new(201)
            .reply(&Context::default())
            .with(&json!({"a": 1, "code": 999}))
            .with(&json!({"a": 2}))
            .await;
        assert_eq!(reply.status(), StatusCode::CREATED);
        assert_eq!(body_json(reply).await, json!({"a": 2, "code": 201, "status": "Created"}));
    }

    #[tokio::test]
    async fn non_object_payloads_become_diagnostics() {
        let reply = Response::ok()
            .reply(&Context::default().with_request_id("rid-1"))
            .with(&vec![1, 2, 3])
            .with("text")
            .await;

        let diagnostics = reply.extensions().get::<Diagnostics>().cloned().unwrap();
        assert_eq!(diagnostics.errors.len(), 2);
        assert!(diagnostics.errors[0].starts_with("couldn't merge reply responses"));
        assert_eq!(diagnostics.request_id.as_deref(), Some("rid-1"));
        assert!(diagnostics.caller.contains("response.rs:"), "{}", diagnostics.caller);
        assert_eq!(body_json(reply).await, json!({"code": 200, "status": "OK"}));
    }

    #[tokio::test]
    async fn redirect_carries_encoded_reply() {
        let reply = Response::error(401, "login required")
            .with_redirect("https://example.com/login")
            .reply(&Context::default())
            .await;
        assert_eq!(reply.status(), StatusCode::FOUND);

        let location = reply.headers()[header::LOCATION].to_str().unwrap();
        let encoded = location
            .strip_prefix("https://example.com/login?response=")
            .unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(encoded).unwrap();
        let decoded: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            decoded,
            json!({"code": 401, "status": "Unauthorized", "error": "login required"})
        );
        assert!(body_json_is_empty(reply).await);
    }

    async fn body_json_is_empty(res: axum::response::Response) -> bool {
        res.into_body().collect().await.unwrap().to_bytes().is_empty()
    }

    #[tokio::test]
    async fn invalid_redirect_target_is_500() {
        let reply = Response::ok()
            .with_redirect("https://example.com/\nbad")
            .reply(&Context::default())
            .await;
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let diagnostics = reply.extensions().get::<Diagnostics>().unwrap();
        assert_eq!(diagnostics.errors.len(), 1);
    }

    #[tokio::test]
    async fn sleep_delays_the_reply() {
        let start = Instant::now();
        let reply = Response::ok()
            .with_sleep(Duration::from_millis(50))
            .reply(&Context::default())
            .await;
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(reply.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bind_errors_render_as_envelopes() {
        let res = BindError::Json("expected value".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(res).await,
            json!({"code": 400, "status": "Bad Request", "error": "expected value"})
        );

        let res = BindError::MissingValidator.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
