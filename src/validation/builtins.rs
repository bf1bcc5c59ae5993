//! Built-in validation predicates.
//!
//! `duration`, `json` and `base64Any` are enabled by name through
//! `Options::validations`. `required`, `base64` and `base64url` are always
//! present in a [`ValidatorEngine`](super::ValidatorEngine).

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::de::IgnoredAny;

use crate::validation::duration::parse_duration;
use crate::validation::engine::{is_empty, FieldLevel, ValidationFn};

pub const DURATION: &str = "duration";
pub const JSON: &str = "json";
pub const BASE64_ANY: &str = "base64Any";

static BASE64_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{4})$")
        .expect("base64 pattern compiles")
});

static BASE64_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_-]{4})*(?:[A-Za-z0-9_-]{2}==|[A-Za-z0-9_-]{3}=|[A-Za-z0-9_-]{4})$")
        .expect("base64url pattern compiles")
});

// Unpadded URL-safe base64, which the padded pattern above rejects.
static BASE64_RAW_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_-]{4})*(?:[A-Za-z0-9_-]{2,4})$")
        .expect("raw base64url pattern compiles")
});

/// Resolve a built-in validation by its option name.
pub fn lookup(name: &str) -> Option<ValidationFn> {
    match name {
        DURATION => Some(Arc::new(validate_duration)),
        JSON => Some(Arc::new(validate_json)),
        BASE64_ANY => Some(Arc::new(validate_base64_any)),
        _ => None,
    }
}

/// The field must be a duration expression such as `"5s"` or `"-1h30m"`.
pub fn validate_duration(fl: &FieldLevel<'_>) -> bool {
    fl.as_str().is_some_and(|s| parse_duration(s).is_ok())
}

/// Strings must hold valid JSON text; any other value must serialize as JSON.
pub fn validate_json(fl: &FieldLevel<'_>) -> bool {
    match fl.as_str() {
        Some(text) => serde_json::from_str::<IgnoredAny>(text).is_ok(),
        None => serde_json::to_string(fl.field()).is_ok(),
    }
}

/// Standard, URL-safe, or unpadded URL-safe base64.
pub fn validate_base64_any(fl: &FieldLevel<'_>) -> bool {
    fl.as_str().is_some_and(|s| is_base64(s) || is_base64_url(s) || is_base64_raw_url(s))
}

pub(crate) fn validate_required(fl: &FieldLevel<'_>) -> bool {
    !is_empty(fl.field())
}

pub(crate) fn validate_base64(fl: &FieldLevel<'_>) -> bool {
    fl.as_str().is_some_and(is_base64)
}

pub(crate) fn validate_base64_url(fl: &FieldLevel<'_>) -> bool {
    fl.as_str().is_some_and(is_base64_url)
}

pub fn is_base64(s: &str) -> bool {
    BASE64_REGEX.is_match(s)
}

pub fn is_base64_url(s: &str) -> bool {
    BASE64_URL_REGEX.is_match(s)
}

pub fn is_base64_raw_url(s: &str) -> bool {
    BASE64_RAW_URL_REGEX.is_match(s)
}
