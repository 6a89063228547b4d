//! Configuration error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// File system operation that failed while loading or saving config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read config file",
            Self::Write => "write config file",
            Self::CreateDir => "create config directory",
        })
    }
}

/// Errors raised while loading, validating or applying a [`DepweaveConfig`].
///
/// [`DepweaveConfig`]: crate::DepweaveConfig
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to {operation} '{path}': {source}")]
    Io {
        operation: IoOperation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config layer is not valid TOML or does not match the schema
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine home directory")]
    NoHomeDir,

    /// A single key holds an unusable value, e.g. a zero cache capacity
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Keys are individually valid but contradict each other
    #[error("configuration validation failed: {0}")]
    ValidationError(String),

    /// The tracing subscriber could not be installed
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(IoOperation::Read, path, source)
    }

    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(IoOperation::Write, path, source)
    }

    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(IoOperation::CreateDir, path, source)
    }

    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    fn io(operation: IoOperation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// The file the error refers to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. } | Self::ParseToml { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_io_error_names_operation_and_path() {
        let err = ConfigError::create_dir(
            "/etc/depweave",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "failed to create config directory '/etc/depweave': denied"
        );
        assert_eq!(err.path(), Some(std::path::Path::new("/etc/depweave")));
    }

    #[test]
    fn test_value_errors_have_no_path() {
        let err = ConfigError::invalid_value("cache.node_capacity", "must be greater than zero");
        assert!(err.to_string().contains("cache.node_capacity"));
        assert!(err.path().is_none());
        assert_eq!(
            ConfigError::NoHomeDir.to_string(),
            "could not determine home directory"
        );
    }
}
