//! Engine configuration.
//!
//! # Data Flow
//! ```text
//! Options (built in code, or TOML file)
//!     → loader.rs (parse & deserialize, file-based only)
//!     → validation.rs (semantic checks, file-based only)
//!     → Engine::new (mode, validators, middleware)
//!     → captured by middleware closures, then dropped
//! ```
//!
//! # Design Decisions
//! - Options are plain data; nothing reads them after the engine is built
//! - All fields have defaults so an empty file is a valid configuration
//! - Validator functions and origin predicates can only be set in code

pub mod loader;
pub mod mode;
pub mod schema;
pub mod validation;

pub use loader::{load_options, ConfigError};
pub use mode::Mode;
pub use schema::{LocationConfig, Options};
