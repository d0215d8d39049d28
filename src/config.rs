//! # Configuration Management
//!
//! Wire constants and runtime configuration for the packet framing core.
//!
//! Packet sizing is fixed at compile time: every packet built or parsed by this
//! crate fits into one UDP datagram of at most [`MAX_PACKET_SIZE`] bytes. The
//! runtime configuration only covers the surroundings of the core, namely the
//! receive buffer pool handed to the socket layer and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Largest datagram on the wire including IPv4 and UDP headers
pub const MAX_PACKET_SIZE_WITH_UDP_HEADER: usize = 1492;

/// IPv4 header plus UDP header overhead added by the network stack
pub const UDP_IPV4_HEADER_SIZE: usize = 28;

/// Largest packet (headers and payload) the transport puts into one datagram
pub const MAX_PACKET_SIZE: usize = MAX_PACKET_SIZE_WITH_UDP_HEADER - UDP_IPV4_HEADER_SIZE;

/// Largest payload a single UDP datagram can carry over IPv4
pub const MAX_UDP_PAYLOAD_SIZE: usize = 65_507;

/// Default number of receive buffers kept by the datagram pool
pub const DEFAULT_RECV_POOL_SIZE: usize = 64;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(size) = std::env::var("UDT_PROTOCOL_RECV_BUFFER_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.transport.recv_buffer_size = val;
            }
        }

        if let Ok(count) = std::env::var("UDT_PROTOCOL_RECV_POOL_SIZE") {
            if let Ok(val) = count.parse::<usize>() {
                config.transport.recv_pool_size = val;
            }
        }

        if let Ok(level) = std::env::var("UDT_PROTOCOL_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid log level in environment: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Receive-side buffer configuration handed to the socket layer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Capacity of each pooled receive buffer in bytes
    pub recv_buffer_size: usize,

    /// Number of receive buffers pre-allocated by the datagram pool
    pub recv_pool_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: MAX_PACKET_SIZE,
            recv_pool_size: DEFAULT_RECV_POOL_SIZE,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.recv_buffer_size < MAX_PACKET_SIZE {
            errors.push(format!(
                "Receive buffer size too small: {} bytes (minimum: {MAX_PACKET_SIZE})",
                self.recv_buffer_size
            ));
        } else if self.recv_buffer_size > MAX_UDP_PAYLOAD_SIZE {
            errors.push(format!(
                "Receive buffer size too large: {} bytes (maximum: {MAX_UDP_PAYLOAD_SIZE})",
                self.recv_buffer_size
            ));
        }

        if self.recv_pool_size == 0 {
            errors.push("Receive pool size must be greater than 0".to_string());
        } else if self.recv_pool_size > 65_536 {
            errors.push(format!(
                "Receive pool size too large: {} (max recommended: 65,536)",
                self.recv_pool_size
            ));
        }

        errors
    }
}

/// Where and how the packet core's `tracing` events are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Name recorded with the startup event
    pub app_name: String,

    /// Default filter level when `RUST_LOG` is unset
    #[serde(with = "level_name")]
    pub log_level: Level,

    pub log_to_console: bool,

    /// Also append events to `log_file_path`
    pub log_to_file: bool,

    pub log_file_path: Option<String>,

    /// One JSON object per event instead of human-readable lines
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("udt-protocol"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Longest accepted `app_name`
    pub const MAX_APP_NAME_LEN: usize = 64;

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match self.app_name.len() {
            0 => errors.push("logging.app_name is empty".to_string()),
            len if len > Self::MAX_APP_NAME_LEN => errors.push(format!(
                "logging.app_name has {len} characters, limit is {}",
                Self::MAX_APP_NAME_LEN
            )),
            _ => {}
        }

        if self.log_to_file {
            match self.log_file_path.as_deref().map(Path::new) {
                None => errors.push(
                    "logging.log_to_file is set without logging.log_file_path".to_string(),
                ),
                Some(path) => {
                    let missing_dir = path
                        .parent()
                        .filter(|dir| !dir.as_os_str().is_empty() && !dir.exists());
                    if let Some(dir) = missing_dir {
                        errors.push(format!(
                            "logging.log_file_path directory {} is missing",
                            dir.display()
                        ));
                    }
                }
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors.push("logging has no output: enable log_to_console or log_to_file".to_string());
        }

        errors
    }
}

/// `tracing::Level` as a lowercase level name in TOML
mod level_name {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_ascii_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse::<Level>()
            .map_err(|_| serde::de::Error::custom(format!("unknown log level `{name}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_size_constants() {
        assert_eq!(MAX_PACKET_SIZE, 1464);
        assert!(MAX_PACKET_SIZE < MAX_UDP_PAYLOAD_SIZE);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = NetworkConfig::default_with_overrides(|c| {
            c.transport.recv_pool_size = 8;
            c.logging.log_level = Level::DEBUG;
        });

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = NetworkConfig::from_toml(&text).unwrap();

        assert_eq!(parsed.transport.recv_pool_size, 8);
        assert_eq!(parsed.logging.log_level, Level::DEBUG);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = NetworkConfig::from_toml(
            r#"
            [transport]
            recv_buffer_size = 2048
            recv_pool_size = 4
            "#,
        )
        .unwrap();

        assert_eq!(parsed.transport.recv_buffer_size, 2048);
        assert_eq!(parsed.logging.app_name, "udt-protocol");
    }
}
