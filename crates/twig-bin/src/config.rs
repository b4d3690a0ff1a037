// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema and file loader.
//!
//! The format is determined by the file extension (`.toml`, `.yaml`/`.yml`,
//! `.json`). A handful of environment variables override the file:
//!
//! ```text
//! TWIG_BUS_NUMBER=1
//! TWIG_SERVER_PORT=9123
//! TWIG_CLIENT_ADDRESS=gateway-host:9123
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use twig_core::error::ConfigError;
use twig_core::types::DeviceConfig;

use crate::error::BinResult;

// =============================================================================
// Schema
// =============================================================================

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfig {
    /// Platform namespace this instance owns, e.g. `twig.0`.
    pub namespace: String,

    /// Local bus number (`/dev/i2c-<N>`).
    pub bus_number: u32,

    /// Port for the RPC server; absent disables the server.
    pub server_port: Option<u16>,

    /// Remote gateway address; set, the local bus is not opened and all
    /// operations go over the wire.
    pub client_address: Option<String>,

    /// Configured peripherals.
    pub devices: Vec<DeviceConfig>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            namespace: "twig.0".to_string(),
            bus_number: 1,
            server_port: None,
            client_address: None,
            devices: Vec::new(),
        }
    }
}

impl AdapterConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::missing_field("namespace"));
        }
        if self.server_port == Some(0) {
            return Err(ConfigError::validation(
                "serverPort",
                "port 0 is not a usable listen port",
            ));
        }
        Ok(())
    }

    /// Returns the effective remote address, treating an empty string the
    /// same as an absent one.
    pub fn remote_address(&self) -> Option<&str> {
        self.client_address.as_deref().filter(|a| !a.is_empty())
    }

    /// Returns the device entries that name both a device and a type.
    pub fn complete_devices(&self) -> impl Iterator<Item = &DeviceConfig> {
        self.devices.iter().filter(|d| d.is_complete())
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// YAML format.
    Yaml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Loads, overrides and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> BinResult<AdapterConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let format = ConfigFormat::from_path(path)?;
    let mut config = parse_config(&content, format).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    apply_env_overrides(&mut config)?;
    config.validate()?;

    debug!(
        devices = config.devices.len(),
        bus = config.bus_number,
        "Configuration loaded"
    );
    Ok(config)
}

/// Parses configuration content in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<AdapterConfig, String> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    }
}

fn apply_env_overrides(config: &mut AdapterConfig) -> Result<(), ConfigError> {
    if let Ok(value) = env::var("TWIG_BUS_NUMBER") {
        config.bus_number = value
            .parse()
            .map_err(|_| ConfigError::validation("TWIG_BUS_NUMBER", "expected a bus number"))?;
    }
    if let Ok(value) = env::var("TWIG_SERVER_PORT") {
        config.server_port = Some(
            value
                .parse()
                .map_err(|_| ConfigError::validation("TWIG_SERVER_PORT", "expected a port"))?,
        );
    }
    if let Ok(value) = env::var("TWIG_CLIENT_ADDRESS") {
        config.client_address = Some(value);
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_toml() {
        let toml = r#"
namespace = "twig.0"
busNumber = 3
serverPort = 9123

[[devices]]
name = "thermo"
type = "generic"
address = 72
"#;
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.bus_number, 3);
        assert_eq!(config.server_port, Some(9123));
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].address.raw(), 0x48);
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
namespace: twig.1
busNumber: 1
devices:
  - name: expander
    type: generic
    address: 32
"#;
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.namespace, "twig.1");
        assert_eq!(config.devices[0].address.raw(), 0x20);
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("twig.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("twig.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("twig.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("twig.ini")).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.namespace, "twig.0");
        assert_eq!(config.bus_number, 1);
        assert!(config.server_port.is_none());
        assert!(config.remote_address().is_none());
    }

    #[test]
    fn test_empty_client_address_counts_as_local() {
        let config = AdapterConfig {
            client_address: Some(String::new()),
            ..Default::default()
        };
        assert!(config.remote_address().is_none());
    }

    #[test]
    fn test_port_zero_is_rejected() {
        let config = AdapterConfig {
            server_port: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_incomplete_devices_filtered() {
        let json = r#"{
            "devices": [
                {"name": "a", "type": "generic", "address": 32},
                {"name": "placeholder", "address": 33}
            ]
        }"#;
        let config = parse_config(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.complete_devices().count(), 1);
    }
}
