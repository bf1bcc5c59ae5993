//! Run modes.

use std::fmt;

/// Environment variable holding the default mode.
pub const MODE_ENV: &str = "AXMAN_MODE";

/// Framework-level run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Quiet; JSON logs.
    Release,
    /// Verbose; route registrations are logged.
    #[default]
    Debug,
    /// Used by test suites.
    Test,
}

impl Mode {
    /// Map a configuration string onto a mode.
    ///
    /// Returns `None` for unrecognized names so the caller can keep its default.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "release" | "production" | "prod" | "stage" | "staging" | "dev" | "development" => {
                Some(Mode::Release)
            }
            "debug" => Some(Mode::Debug),
            "test" => Some(Mode::Test),
            _ => None,
        }
    }

    /// The default mode, taken from `AXMAN_MODE` (falls back to [`Mode::Debug`]).
    pub fn from_env() -> Self {
        std::env::var(MODE_ENV)
            .ok()
            .and_then(|v| Self::from_name(v.trim()))
            .unwrap_or_default()
    }

    /// Resolve a configured name, keeping the environment default when unrecognized.
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(Self::from_env)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Release => "release",
            Mode::Debug => "debug",
            Mode::Test => "test",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_aliases() {
        for name in ["release", "production", "prod", "stage", "staging", "dev", "development"] {
            assert_eq!(Mode::from_name(name), Some(Mode::Release), "{name}");
        }
    }

    #[test]
    fn debug_and_test() {
        assert_eq!(Mode::from_name("debug"), Some(Mode::Debug));
        assert_eq!(Mode::from_name("test"), Some(Mode::Test));
    }

    #[test]
    fn unknown_names_are_ignored() {
        assert_eq!(Mode::from_name(""), None);
        assert_eq!(Mode::from_name("Release"), None);
        assert_eq!(Mode::from_name("qa"), None);
    }
}
