//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::Options;
use crate::config::validation::{validate_options, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl FromStr for Options {
    type Err = ConfigError;

    /// Parse and validate options from TOML text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let options: Options = toml::from_str(s).map_err(ConfigError::Parse)?;
        validate_options(&options).map_err(ConfigError::Validation)?;
        Ok(options)
    }
}

/// Load and validate options from a TOML file.
pub fn load_options(path: &Path) -> Result<Options, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let options: Options = content.parse()?;

    tracing::debug!(path = %path.display(), mode = %options.resolved_mode(), "Options loaded");
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let options: Options = r#"
            mode = "test"
            enable_compression = true
            enable_request_id = true
            validations = ["duration", "json", "base64Any"]

            [context_metadata]
            env = "dev"
            replicas = 3

            [cors]
            allow_origins = ["http://localhost:8080"]
            allow_methods = ["GET", "POST"]
            max_age_secs = 600

            [location]
            host = "example.com"
        "#
        .parse()
        .unwrap();

        assert_eq!(options.mode, "test");
        assert!(options.enable_compression);
        assert!(!options.enable_location);
        assert_eq!(options.validations.len(), 3);
        assert_eq!(options.context_metadata["env"], "dev");
        assert_eq!(options.context_metadata["replicas"], 3);
        assert_eq!(options.cors.allow_origins, vec!["http://localhost:8080"]);
        assert_eq!(options.cors.max_age_secs, 600);
        assert_eq!(options.location.host, "example.com");
        assert_eq!(options.location.scheme, "http");
    }

    #[test]
    fn empty_file_is_default() {
        let options: Options = "".parse().unwrap();
        assert!(options.context_metadata.is_empty());
        assert!(!options.cors.is_configured());
    }

    #[test]
    fn rejects_bad_toml() {
        let err = "mode = ".parse::<Options>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn collects_validation_errors() {
        let err = r#"
            mode = "staging-eu"
            validations = ["uuid"]
        "#
        .parse::<Options>()
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "validations");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_options(Path::new("/nonexistent/axman.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
