//! depweave Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.depweave/config.toml`
//! - Local config: `.depweave/config.toml` (in workspace)
//! - Caller overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → overrides.

mod error;
mod loader;
pub mod logging;

pub use error::{ConfigError, IoOperation};
pub use loader::{
    CacheLayer, CollectorLayer, ConfigLayer, ConfigLoader, LoggingLayer, RepositoryLayer,
};

use serde::{Deserialize, Serialize};

/// Root configuration for depweave.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DepweaveConfig {
    /// Dependency collection behaviour
    pub collector: CollectorConfig,

    /// Session cache sizing
    pub cache: CacheConfig,

    /// Default repositories and mirrors
    pub repositories: RepositoryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Collection behaviour.
///
/// # Example TOML
///
/// ```toml
/// [collector]
/// max_exceptions = 50
/// descriptor_policy = "ignore-missing"
/// excluded_scopes = ["test", "provided", "system"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    /// Maximum number of per-branch failures kept in a result
    pub max_exceptions: usize,

    /// Maximum number of dependency cycles kept in a result
    pub max_cycles: usize,

    /// How descriptor read failures are treated
    pub descriptor_policy: DescriptorPolicy,

    /// Never merge repositories declared by descriptors into the search list
    pub ignore_descriptor_repositories: bool,

    /// Scopes dropped from transitive dependencies
    pub excluded_scopes: Vec<String>,

    /// Drop optional dependencies of dependencies
    pub exclude_transitive_optionals: bool,

    /// Context tag attached to every request and edge
    pub request_context: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_exceptions: 100,
            max_cycles: 10,
            descriptor_policy: DescriptorPolicy::default(),
            ignore_descriptor_repositories: false,
            excluded_scopes: vec!["test".to_string(), "provided".to_string()],
            exclude_transitive_optionals: true,
            request_context: "project".to_string(),
        }
    }
}

/// Treatment of descriptor (manifest) read failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DescriptorPolicy {
    /// Every failure is recorded against the branch (default)
    #[default]
    Strict,
    /// A missing descriptor is treated as an empty one
    IgnoreMissing,
    /// Any descriptor failure is treated as an empty descriptor
    IgnoreErrors,
}

impl std::fmt::Display for DescriptorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::IgnoreMissing => write!(f, "ignore-missing"),
            Self::IgnoreErrors => write!(f, "ignore-errors"),
        }
    }
}

impl std::str::FromStr for DescriptorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "ignore-missing" | "ignore_missing" => Ok(Self::IgnoreMissing),
            "ignore-errors" | "ignore_errors" => Ok(Self::IgnoreErrors),
            _ => Err(ConfigError::ValidationError(format!(
                "Unknown descriptor policy: '{}'. Valid values: strict, ignore-missing, ignore-errors",
                s
            ))),
        }
    }
}

/// Session cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Capacity of the subtree (node) LRU cache
    pub node_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            node_capacity: 10_000,
        }
    }
}

/// Default repositories and mirror overlays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Repositories searched when a request names none
    pub remote: Vec<RepositoryEntry>,

    /// Mirrors substituted for newly discovered repositories
    pub mirrors: Vec<MirrorEntry>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            remote: vec![RepositoryEntry {
                id: "central".to_string(),
                url: "https://repo.maven.apache.org/maven2".to_string(),
            }],
            mirrors: Vec::new(),
        }
    }
}

/// A named remote repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryEntry {
    /// Repository id
    pub id: String,
    /// Base URL
    pub url: String,
}

/// A mirror standing in for one or more repositories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorEntry {
    /// Mirror repository id
    pub id: String,
    /// Mirror base URL
    pub url: String,
    /// Ids of mirrored repositories, or `"*"` for all
    pub mirror_of: Vec<String>,
}

impl MirrorEntry {
    /// Whether this mirror replaces the repository with the given id.
    pub fn mirrors(&self, repository_id: &str) -> bool {
        self.mirror_of
            .iter()
            .any(|pattern| pattern == "*" || pattern == repository_id)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// Caller overrides for configuration values.
///
/// Applied over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override the exception cap
    pub max_exceptions: Option<usize>,

    /// Override the descriptor policy
    pub descriptor_policy: Option<DescriptorPolicy>,

    /// Override descriptor repository handling
    pub ignore_descriptor_repositories: Option<bool>,

    /// Override the subtree cache capacity
    pub node_capacity: Option<usize>,

    /// Override log level
    pub log_level: Option<String>,
}

impl DepweaveConfig {
    /// Apply overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(max) = overrides.max_exceptions {
            self.collector.max_exceptions = max;
        }

        if let Some(policy) = overrides.descriptor_policy {
            self.collector.descriptor_policy = policy;
        }

        if let Some(ignore) = overrides.ignore_descriptor_repositories {
            self.collector.ignore_descriptor_repositories = ignore;
        }

        if let Some(capacity) = overrides.node_capacity {
            self.cache.node_capacity = capacity;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.node_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "cache.node_capacity",
                "must be greater than zero",
            ));
        }

        for mirror in &self.repositories.mirrors {
            if mirror.id.is_empty() || mirror.url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "repositories.mirrors entries need both id and url".to_string(),
                ));
            }
            if mirror.mirror_of.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "mirror '{}' does not mirror any repository",
                    mirror.id
                )));
            }
        }

        for repo in &self.repositories.remote {
            if repo.id.is_empty() {
                return Err(ConfigError::invalid_value(
                    "repositories.remote",
                    format!("repository with url '{}' has no id", repo.url),
                ));
            }
        }

        Ok(())
    }
}
