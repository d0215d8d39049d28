//! # Logging Setup
//!
//! Installs a global `tracing` subscriber built from [`LoggingConfig`].
//!
//! `RUST_LOG` takes precedence over the configured level when it is set.

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// Fails with [`ProtocolError::ConfigError`] on an invalid configuration, an
/// unopenable log file, or when a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ProtocolError::ConfigError(errors.join("; ")));
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.log_to_console {
        let console = fmt::layer().with_target(true);
        layers.push(if config.json_format {
            console.json().boxed()
        } else {
            console.boxed()
        });
    }

    if config.log_to_file {
        if let Some(ref path) = config.log_file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ProtocolError::ConfigError(format!("Failed to open log file {path}: {e}"))
                })?;
            let file_layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            layers.push(if config.json_format {
                file_layer.json().boxed()
            } else {
                file_layer.boxed()
            });
        }
    }

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| ProtocolError::ConfigError(format!("Failed to install subscriber: {e}")))?;

    info!(
        app_name = %config.app_name,
        level = %config.log_level,
        json = config.json_format,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let config = LoggingConfig {
            log_to_file: true,
            log_file_path: None,
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(ProtocolError::ConfigError(_))
        ));
    }

    #[test]
    fn test_second_install_fails() {
        let config = LoggingConfig::default();
        let _ = init_logging(&config);
        assert!(matches!(
            init_logging(&config),
            Err(ProtocolError::ConfigError(_))
        ));
    }
}
