//! Binding and validation errors.

use std::fmt;

use thiserror::Error;

/// A single field that failed a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    namespace: String,
    field: String,
    tag: String,
    param: String,
}

impl FieldError {
    pub fn new(namespace: &str, field: &str, tag: &str, param: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            field: field.to_string(),
            tag: tag.to_string(),
            param: param.to_string(),
        }
    }

    /// `Type.Field`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn param(&self) -> &str {
        &self.param
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Key: '{}' Error:Field validation for '{}' failed on the '{}' tag",
            self.namespace, self.field, self.tag
        )
    }
}

/// Every field that failed validation, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Errors raised while binding a request body.
#[derive(Debug, Error)]
pub enum BindError {
    /// The body is not JSON or does not match the target type.
    #[error("{0}")]
    Json(String),

    /// One or more fields failed their tags.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A rule names a tag nobody registered.
    #[error("undefined validation function '{tag}' on field '{field}'")]
    UndefinedValidation { tag: String, field: String },

    /// The request reached the extractor without passing through an engine.
    #[error("no validator is attached to the request")]
    MissingValidator,
}

impl BindError {
    /// Whether the client is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, BindError::Json(_) | BindError::Validation(_))
    }
}
