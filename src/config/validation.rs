//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of file-based options (serde handles syntactic)
//! - Reject validation names that would otherwise be silently ignored
//! - Surface CORS policy conflicts before the engine is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Programmatic options skip this step and keep the lenient builder behavior
//! - An unknown mode keeps the environment default, as in the builder; it is
//!   only warned about

use std::fmt;

use crate::config::{Mode, Options};
use crate::validation::builtins;

/// A single problem found in an options file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check options loaded from a file.
pub fn validate_options(options: &Options) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !options.mode.is_empty() && Mode::from_name(&options.mode).is_none() {
        tracing::warn!(
            mode = %options.mode,
            fallback = %Mode::from_env(),
            "Unknown mode; keeping the default"
        );
    }

    for name in &options.validations {
        if builtins::lookup(name).is_none() {
            errors.push(ValidationError {
                field: "validations",
                message: format!("unknown validation '{}'", name),
            });
        }
    }

    if options.cors.is_configured() {
        if let Err(e) = options.cors.validate() {
            errors.push(ValidationError {
                field: "cors",
                message: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
