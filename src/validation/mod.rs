//! Tag-based field validation.
//!
//! # Data Flow
//! ```text
//! Engine::new
//!     → builtins.rs (resolve duration / json / base64Any by name)
//!     → engine.rs (register tag → predicate into the ValidatorEngine handle)
//!     → SharedValidator request extension
//!
//! Handler extracts Valid<T>
//!     → extract.rs (parse JSON body, decode T)
//!     → StructValidator::validate_struct (run T::RULES tag lists)
//!     → BindError on failure (rendered through the reply envelope)
//! ```
//!
//! # Design Decisions
//! - The engine is an explicit handle passed through `Options`, never a global
//! - Last registration for a tag wins
//! - Validation runs over the decoded JSON value, so rules use wire names

pub mod builtins;
pub mod duration;
pub mod engine;
pub mod error;
pub mod extract;

pub use duration::{parse_duration, DurationError, SignedDuration};
pub use engine::{FieldLevel, FieldRule, StructValidator, ValidationFn, ValidatorEngine};
pub use error::{BindError, FieldError, ValidationErrors};
pub use extract::{SharedValidator, Valid, Validate};
