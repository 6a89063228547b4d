//! Logging initialisation from `[logging]` settings.

use tracing_subscriber::EnvFilter;

use crate::{ConfigError, LogFormat, LoggingConfig};

/// Build the filter for a logging configuration.
///
/// `RUST_LOG` takes precedence when it is set.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))
}

/// Install a global `tracing` subscriber.
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| ConfigError::Logging(e.to_string()))
}
