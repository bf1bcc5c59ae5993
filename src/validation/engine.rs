//! Validator engine handle.
//!
//! # Responsibilities
//! - Hold tag → predicate registrations
//! - Run tag lists (`"omitempty,duration"`) against single values or whole objects
//! - Produce field-level errors in a stable, human-readable format
//!
//! # Design Decisions
//! - Registrations live in a `DashMap`: written while building, read from every request
//! - Predicates are cloned out of the map before they run, so a predicate may
//!   call back into the engine

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::validation::builtins;
use crate::validation::error::{BindError, FieldError, ValidationErrors};

/// A validation predicate.
pub type ValidationFn = Arc<dyn Fn(&FieldLevel<'_>) -> bool + Send + Sync>;

/// Tag that skips the remaining tags of an empty value.
pub const OMIT_EMPTY: &str = "omitempty";

/// The value under validation, as seen by a predicate.
#[derive(Debug, Clone, Copy)]
pub struct FieldLevel<'a> {
    value: &'a Value,
    field_name: &'a str,
    param: &'a str,
}

impl<'a> FieldLevel<'a> {
    pub fn new(value: &'a Value, field_name: &'a str, param: &'a str) -> Self {
        Self {
            value,
            field_name,
            param,
        }
    }

    /// The raw field value.
    pub fn field(&self) -> &'a Value {
        self.value
    }

    /// The value as a string, if it is one.
    pub fn as_str(&self) -> Option<&'a str> {
        self.value.as_str()
    }

    pub fn field_name(&self) -> &'a str {
        self.field_name
    }

    /// Text after `=` in the tag (`"min=3"` → `"3"`), empty otherwise.
    pub fn param(&self) -> &'a str {
        self.param
    }
}

/// Validation rule for one field of a bound type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Key in the JSON object.
    pub key: &'static str,
    /// Field name used in error messages.
    pub field: &'static str,
    /// Comma-separated tags.
    pub tags: &'static str,
}

impl FieldRule {
    pub const fn new(key: &'static str, field: &'static str, tags: &'static str) -> Self {
        Self { key, field, tags }
    }
}

/// Something that can validate decoded request bodies.
///
/// The engine builder registers tags only into a [`ValidatorEngine`]; other
/// implementations are accepted for binding but rejected at build time when
/// validations are requested.
pub trait StructValidator: Send + Sync + 'static {
    /// Check every rule against `value`, a JSON object.
    fn validate_struct(
        &self,
        type_name: &str,
        value: &Value,
        rules: &[FieldRule],
    ) -> Result<(), BindError>;

    /// The concrete engine behind this handle.
    fn engine(&self) -> &(dyn Any + Send + Sync);
}

/// Tag-based validator engine.
pub struct ValidatorEngine {
    validations: DashMap<String, ValidationFn>,
}

impl ValidatorEngine {
    /// Create an engine with the baked-in tags `required`, `base64` and `base64url`.
    pub fn new() -> Self {
        let engine = Self {
            validations: DashMap::new(),
        };
        engine.register_validation("required", Arc::new(builtins::validate_required));
        engine.register_validation("base64", Arc::new(builtins::validate_base64));
        engine.register_validation("base64url", Arc::new(builtins::validate_base64_url));
        engine
    }

    /// Register a predicate under `tag`, returning the one it replaced.
    pub fn register_validation(
        &self,
        tag: impl Into<String>,
        func: ValidationFn,
    ) -> Option<ValidationFn> {
        self.validations.insert(tag.into(), func)
    }

    /// Look up the predicate registered under `tag`.
    pub fn lookup(&self, tag: &str) -> Option<ValidationFn> {
        self.validations.get(tag).map(|entry| entry.value().clone())
    }

    /// Registered tag names, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.validations.iter().map(|e| e.key().clone()).collect();
        tags.sort();
        tags
    }

    /// Validate a single value against a tag list.
    pub fn var(&self, value: &Value, tags: &str) -> Result<(), BindError> {
        match self.failing_tag(value, "", tags)? {
            None => Ok(()),
            Some((tag, param)) => Err(ValidationErrors::from(vec![FieldError::new(
                "", "", tag, param,
            )])
            .into()),
        }
    }

    /// Return the first tag `value` fails, with its parameter.
    fn failing_tag<'t>(
        &self,
        value: &Value,
        field: &str,
        tags: &'t str,
    ) -> Result<Option<(&'t str, &'t str)>, BindError> {
        for raw in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if raw == OMIT_EMPTY {
                if is_empty(value) {
                    return Ok(None);
                }
                continue;
            }
            let (tag, param) = raw.split_once('=').unwrap_or((raw, ""));
            let func = self
                .lookup(tag)
                .ok_or_else(|| BindError::UndefinedValidation {
                    tag: tag.to_string(),
                    field: field.to_string(),
                })?;
            if !func(&FieldLevel::new(value, field, param)) {
                return Ok(Some((tag, param)));
            }
        }
        Ok(None)
    }
}

impl Default for ValidatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidatorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorEngine")
            .field("tags", &self.tags())
            .finish()
    }
}

impl StructValidator for ValidatorEngine {
    fn validate_struct(
        &self,
        type_name: &str,
        value: &Value,
        rules: &[FieldRule],
    ) -> Result<(), BindError> {
        let mut errors = Vec::new();
        for rule in rules {
            let field_value = value.get(rule.key).unwrap_or(&Value::Null);
            if let Some((tag, param)) = self.failing_tag(field_value, rule.field, rule.tags)? {
                let namespace = format!("{}.{}", type_name, rule.field);
                errors.push(FieldError::new(&namespace, rule.field, tag, param));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::from(errors).into())
        }
    }

    fn engine(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

/// Whether a value counts as empty for `omitempty` and `required`.
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn last_registration_wins() {
        let engine = ValidatorEngine::new();
        engine.register_validation(
            "even",
            Arc::new(|fl: &FieldLevel<'_>| fl.field().as_u64().is_some_and(|n| n % 2 == 0)),
        );
        assert!(engine.var(&json!(2), "even").is_ok());

        let replaced = engine.register_validation("even", Arc::new(|_: &FieldLevel<'_>| false));
        assert!(replaced.is_some());
        assert!(engine.var(&json!(2), "even").is_err());
    }

    #[test]
    fn omitempty_skips_remaining_tags() {
        let engine = ValidatorEngine::new();
        assert!(engine.var(&json!(""), "omitempty,base64").is_ok());
        assert!(engine.var(&json!(null), "omitempty,required").is_ok());
        assert!(engine.var(&json!("!!"), "omitempty,base64").is_err());
    }

    #[test]
    fn required_rejects_empty_values() {
        let engine = ValidatorEngine::new();
        for value in [json!(null), json!(""), json!(0), json!(false), json!([]), json!({})] {
            assert!(engine.var(&value, "required").is_err(), "{value}");
        }
        assert!(engine.var(&json!("x"), "required").is_ok());
    }

    #[test]
    fn params_are_passed_to_predicates() {
        let engine = ValidatorEngine::new();
        engine.register_validation(
            "prefix",
            Arc::new(|fl: &FieldLevel<'_>| fl.as_str().is_some_and(|s| s.starts_with(fl.param()))),
        );
        assert!(engine.var(&json!("axman"), "prefix=ax").is_ok());

        let err = engine.var(&json!("gin"), "prefix=ax").unwrap_err();
        match err {
            BindError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors.iter().next().map(|e| e.param()), Some("ax"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let engine = ValidatorEngine::new();
        let err = engine.var(&json!("x"), "uuid").unwrap_err();
        assert!(matches!(err, BindError::UndefinedValidation { ref tag, .. } if tag == "uuid"));
    }

    #[test]
    fn struct_errors_use_namespaces() {
        let engine = ValidatorEngine::new();
        let rules = [
            FieldRule::new("name", "Name", "required"),
            FieldRule::new("data", "Data", "omitempty,base64"),
        ];
        let err = engine
            .validate_struct("Upload", &json!({"data": "%%%"}), &rules)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Key: 'Upload.Name' Error:Field validation for 'Name' failed on the 'required' tag\n\
             Key: 'Upload.Data' Error:Field validation for 'Data' failed on the 'base64' tag"
        );
    }

    #[test]
    fn engine_downcasts_to_itself() {
        let handle: Arc<dyn StructValidator> = Arc::new(ValidatorEngine::new());
        assert!(handle.engine().downcast_ref::<ValidatorEngine>().is_some());
    }
}
