//! Validated JSON extraction.

use std::sync::Arc;

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::validation::engine::{FieldRule, StructValidator};
use crate::validation::error::BindError;

/// Types that declare per-field validation rules.
///
/// ```
/// use axman::validation::{FieldRule, Validate};
///
/// #[derive(serde::Deserialize)]
/// struct Upload {
///     ttl: String,
///     data: String,
/// }
///
/// impl Validate for Upload {
///     const RULES: &'static [FieldRule] = &[
///         FieldRule::new("ttl", "Ttl", "omitempty,duration"),
///         FieldRule::new("data", "Data", "required,base64Any"),
///     ];
/// }
/// ```
pub trait Validate {
    const RULES: &'static [FieldRule];

    /// Name used as the namespace prefix in field errors.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// The validator handle the engine attaches to every request.
#[derive(Clone)]
pub struct SharedValidator(pub Arc<dyn StructValidator>);

/// JSON body that was decoded and then validated against `T::RULES`.
#[derive(Debug, Clone)]
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = BindError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let validator = req
            .extensions()
            .get::<SharedValidator>()
            .cloned()
            .ok_or(BindError::MissingValidator)?;

        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| BindError::Json(rejection.body_text()))?;

        let inner = T::deserialize(&value).map_err(|e| BindError::Json(e.to_string()))?;
        validator.0.validate_struct(T::type_name(), &value, T::RULES)?;

        Ok(Valid(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Deserialize)]
    struct Req {
        foo: String,
    }

    impl Validate for Req {
        const RULES: &'static [FieldRule] = &[];
    }

    #[test]
    fn type_name_is_unqualified() {
        assert_eq!(Req::type_name(), "Req");
    }
}
