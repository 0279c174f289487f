//! Configuration error types

use thiserror::Error;

/// Errors raised while reading musebot configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required environment variable
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable present but unparseable
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    /// URL variable that does not parse as an absolute http(s) URL
    #[error("invalid URL format for {0}: {1}")]
    InvalidUrl(String, String),

    /// A configured component name has no registered factory
    #[error("unknown {kind} '{name}' (available: {available})")]
    UnknownComponent {
        kind: &'static str,
        name: String,
        available: String,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::UnknownComponent`] from the registry's known names
    pub fn unknown_component<'a>(
        kind: &'static str,
        name: impl Into<String>,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::UnknownComponent {
            kind,
            name: name.into(),
            available: available.into_iter().collect::<Vec<_>>().join(", "),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_component_lists_available() {
        let err = ConfigError::unknown_component("backend", "vlc", ["mpd", "memory"]);
        assert_eq!(
            err.to_string(),
            "unknown backend 'vlc' (available: mpd, memory)"
        );
    }
}
