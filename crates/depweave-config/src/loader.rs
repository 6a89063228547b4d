//! Layered configuration loading.
//!
//! A [`DepweaveConfig`] is assembled from, in increasing precedence:
//! 1. Built-in defaults
//! 2. Global file: `~/.depweave/config.toml`
//! 3. Workspace file: `<workspace>/.depweave/config.toml`
//! 4. Caller overrides ([`ConfigOverrides`])
//!
//! Each file is read as a [`ConfigLayer`] holding only the keys it sets, so
//! a later file can restore a value an earlier one changed, defaults
//! included. Mirrors are the exception: they accumulate across layers, a
//! later mirror replacing an earlier one with the same id.

use crate::error::ConfigError;
use crate::{
    ConfigOverrides, DepweaveConfig, DescriptorPolicy, LogFormat, MirrorEntry, RepositoryEntry,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".depweave";

// ============================================================================
// Layers
// ============================================================================

/// The keys set by one config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub collector: CollectorLayer,
    pub cache: CacheLayer,
    pub repositories: RepositoryLayer,
    pub logging: LoggingLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollectorLayer {
    pub max_exceptions: Option<usize>,
    pub max_cycles: Option<usize>,
    pub descriptor_policy: Option<DescriptorPolicy>,
    pub ignore_descriptor_repositories: Option<bool>,
    pub excluded_scopes: Option<Vec<String>>,
    pub exclude_transitive_optionals: Option<bool>,
    pub request_context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheLayer {
    pub node_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RepositoryLayer {
    /// Replaces the default repository list when set
    pub remote: Option<Vec<RepositoryEntry>>,
    /// Added to the mirrors of lower layers
    pub mirrors: Vec<MirrorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingLayer {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

/// Overwrite `target` with `value` when the layer set it.
fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl ConfigLayer {
    /// Parse a layer from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
    }

    /// Write every key this layer sets into `config`.
    pub fn apply(self, config: &mut DepweaveConfig) {
        let collector = &mut config.collector;
        set(&mut collector.max_exceptions, self.collector.max_exceptions);
        set(&mut collector.max_cycles, self.collector.max_cycles);
        set(
            &mut collector.descriptor_policy,
            self.collector.descriptor_policy,
        );
        set(
            &mut collector.ignore_descriptor_repositories,
            self.collector.ignore_descriptor_repositories,
        );
        set(&mut collector.excluded_scopes, self.collector.excluded_scopes);
        set(
            &mut collector.exclude_transitive_optionals,
            self.collector.exclude_transitive_optionals,
        );
        set(&mut collector.request_context, self.collector.request_context);

        set(&mut config.cache.node_capacity, self.cache.node_capacity);

        set(&mut config.repositories.remote, self.repositories.remote);
        let mirrors = &mut config.repositories.mirrors;
        for mirror in self.repositories.mirrors {
            mirrors.retain(|m| m.id != mirror.id);
            mirrors.push(mirror);
        }

        set(&mut config.logging.level, self.logging.level);
        set(&mut config.logging.format, self.logging.format);
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Finds, caches and writes config files.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    global_dir: Option<PathBuf>,
    global_layer: Option<ConfigLayer>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader whose global directory is `~/.depweave`, when there is a home
    /// directory.
    pub fn new() -> Self {
        Self {
            global_dir: dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME)),
            global_layer: None,
        }
    }

    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_dir: Some(global_dir.into()),
            global_layer: None,
        }
    }

    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_dir.as_ref().map(|d| d.join(CONFIG_FILE_NAME))
    }

    pub fn local_config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Build the effective configuration for `workspace_root` and validate it.
    pub fn load(
        &mut self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<DepweaveConfig, ConfigError> {
        let mut config = DepweaveConfig::default();
        if let Some(layer) = self.load_global()? {
            layer.apply(&mut config);
        }
        if let Some(layer) = self.load_local(workspace_root)? {
            layer.apply(&mut config);
        }
        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }
        config.validate()?;
        Ok(config)
    }

    /// The global layer; read once, then served from memory until
    /// [`clear_cache`](Self::clear_cache).
    pub fn load_global(&mut self) -> Result<Option<ConfigLayer>, ConfigError> {
        if let Some(layer) = &self.global_layer {
            return Ok(Some(layer.clone()));
        }
        let Some(path) = self.global_config_path() else {
            debug!("No home directory, global config skipped");
            return Ok(None);
        };
        let Some(layer) = read_layer(&path)? else {
            return Ok(None);
        };
        self.global_layer = Some(layer.clone());
        Ok(Some(layer))
    }

    pub fn load_local(&self, workspace_root: &Path) -> Result<Option<ConfigLayer>, ConfigError> {
        read_layer(&self.local_config_path(workspace_root))
    }

    pub fn save_global(&self, config: &DepweaveConfig) -> Result<(), ConfigError> {
        let path = self.global_config_path().ok_or(ConfigError::NoHomeDir)?;
        write_config(&path, config)
    }

    pub fn save_local(
        &self,
        workspace_root: &Path,
        config: &DepweaveConfig,
    ) -> Result<(), ConfigError> {
        write_config(&self.local_config_path(workspace_root), config)
    }

    /// Write a default workspace file unless one exists. Returns its path.
    pub fn init_local(&self, workspace_root: &Path) -> Result<PathBuf, ConfigError> {
        let path = self.local_config_path(workspace_root);
        if !path.exists() {
            write_config(&path, &DepweaveConfig::default())?;
        }
        Ok(path)
    }

    pub fn clear_cache(&mut self) {
        self.global_layer = None;
    }
}

fn read_layer(path: &Path) -> Result<Option<ConfigLayer>, ConfigError> {
    if !path.exists() {
        trace!("No config file at {}", path.display());
        return Ok(None);
    }
    debug!("Loading config layer from {}", path.display());
    ConfigLayer::from_path(path).map(Some)
}

fn write_config(path: &Path, config: &DepweaveConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}
