//! Configuration management for the NVMe bridge

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{BridgeError, Result};
use tracing::{debug, info};

/// Environment variable naming a configuration file
pub const CONFIG_PATH_ENV: &str = "NVME_BRIDGE_CONFIG";

/// Environment variable overriding the backend address
pub const BACKEND_ADDRESS_ENV: &str = "NVME_BRIDGE_BACKEND_ADDRESS";

/// Main configuration for the bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Storage engine connection
    pub backend: BackendConfig,
    /// List pagination
    pub pagination: PaginationConfig,
    /// Logging
    pub logging: LoggingConfig,
}

/// Storage engine connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// `unix:<path>`, a bare socket path, or `host:port`
    pub address: String,
    /// Prepended to every backend method name
    pub method_prefix: String,
    /// Per-call timeout; unset means wait for the backend indefinitely
    pub call_timeout_ms: Option<u64>,
    /// Lowest controller id handed to a new subsystem
    pub min_ctrlr_id: u32,
    /// Highest controller id handed to a new subsystem
    pub max_ctrlr_id: u32,
    /// Controller id sent when the caller leaves the choice to the backend
    pub auto_ctrlr_id: i32,
}

/// Where the backend listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendAddress {
    Unix(PathBuf),
    Tcp(String),
}

/// List pagination settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Upper bound applied to client page sizes, 0 disables the cap
    pub max_page_size: i32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG` when set
    pub filter: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "unix:/var/tmp/spdk.sock".to_string(),
            method_prefix: String::new(),
            call_timeout_ms: None,
            min_ctrlr_id: 1,
            max_ctrlr_id: 0xFFF0,
            auto_ctrlr_id: 0xFFFF,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "nvme_bridge=info,bridge_jsonrpc=info".to_string(),
        }
    }
}

impl BackendConfig {
    /// Parse the configured address
    pub fn parsed_address(&self) -> Result<BackendAddress> {
        let address = self.address.trim();
        if address.is_empty() {
            return Err(BridgeError::ConfigError("backend address is empty".to_string()));
        }

        if let Some(path) = address.strip_prefix("unix:") {
            return Ok(BackendAddress::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = address.strip_prefix("tcp:") {
            return Ok(BackendAddress::Tcp(addr.to_string()));
        }
        if address.starts_with('/') || address.starts_with('.') {
            return Ok(BackendAddress::Unix(PathBuf::from(address)));
        }
        Ok(BackendAddress::Tcp(address.to_string()))
    }

    /// Wire name of a backend method
    pub fn method_name(&self, method: &str) -> String {
        format!("{}{}", self.method_prefix, method)
    }
}

impl BridgeConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                info!(%path, "loading bridge configuration");
                ConfigLoader::load_from_file(Path::new(&path))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(address) = std::env::var(BACKEND_ADDRESS_ENV) {
            info!(%address, "backend address taken from environment");
            config.backend.address = address;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.backend.parsed_address()?;

        if self.backend.min_ctrlr_id > self.backend.max_ctrlr_id {
            return Err(BridgeError::ConfigError(format!(
                "controller id range is empty: {}..={}",
                self.backend.min_ctrlr_id, self.backend.max_ctrlr_id
            )));
        }
        if self.backend.auto_ctrlr_id < 0 {
            return Err(BridgeError::ConfigError(format!(
                "auto_ctrlr_id cannot be negative: {}",
                self.backend.auto_ctrlr_id
            )));
        }
        if self.pagination.max_page_size < 0 {
            return Err(BridgeError::ConfigError(
                "max_page_size cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loader that supports multiple formats
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<BridgeConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::ConfigError(format!("Failed to read config file: {}", e)))?;

        debug!(path = %path.display(), "parsing configuration file");
        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::load_from_toml(&content)?,
            Some("yaml") | Some("yml") => Self::load_from_yaml(&content)?,
            Some("json") => Self::load_from_json(&content)?,
            _ => return Err(BridgeError::ConfigError("Unsupported config file format".to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn load_from_toml(content: &str) -> Result<BridgeConfig> {
        toml::from_str(content)
            .map_err(|e| BridgeError::ConfigError(format!("Failed to parse TOML config: {}", e)))
    }

    /// Load configuration from YAML string
    pub fn load_from_yaml(content: &str) -> Result<BridgeConfig> {
        serde_yaml::from_str(content)
            .map_err(|e| BridgeError::ConfigError(format!("Failed to parse YAML config: {}", e)))
    }

    /// Load configuration from JSON string
    pub fn load_from_json(content: &str) -> Result<BridgeConfig> {
        serde_json::from_str(content)
            .map_err(|e| BridgeError::ConfigError(format!("Failed to parse JSON config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.backend.parsed_address().unwrap(),
            BackendAddress::Unix(PathBuf::from("/var/tmp/spdk.sock"))
        );
    }

    #[test]
    fn test_address_forms() {
        let mut backend = BackendConfig::default();

        backend.address = "127.0.0.1:5260".to_string();
        assert_eq!(backend.parsed_address().unwrap(), BackendAddress::Tcp("127.0.0.1:5260".into()));

        backend.address = "tcp:engine:5260".to_string();
        assert_eq!(backend.parsed_address().unwrap(), BackendAddress::Tcp("engine:5260".into()));

        backend.address = "/run/engine.sock".to_string();
        assert_eq!(
            backend.parsed_address().unwrap(),
            BackendAddress::Unix(PathBuf::from("/run/engine.sock"))
        );

        backend.address = "  ".to_string();
        assert!(backend.parsed_address().is_err());
    }

    #[test]
    fn test_method_prefix() {
        let backend = BackendConfig {
            method_prefix: "vendor_nvm_".to_string(),
            ..BackendConfig::default()
        };
        assert_eq!(backend.method_name("create_subsystem"), "vendor_nvm_create_subsystem");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ConfigLoader::load_from_toml(
            r#"
            [backend]
            address = "unix:/tmp/engine.sock"
            call_timeout_ms = 500

            [pagination]
            max_page_size = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.address, "unix:/tmp/engine.sock");
        assert_eq!(config.backend.call_timeout_ms, Some(500));
        assert_eq!(config.backend.max_ctrlr_id, 0xFFF0);
        assert_eq!(config.pagination.max_page_size, 50);
        assert_eq!(config.logging.filter, LoggingConfig::default().filter);
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bridge.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"backend": {{"min_ctrlr_id": 10, "max_ctrlr_id": 5}}}}"#).unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, BridgeError::ConfigError(_)));

        let unsupported = dir.path().join("bridge.ini");
        std::fs::write(&unsupported, "").unwrap();
        assert!(ConfigLoader::load_from_file(&unsupported).is_err());
    }

    #[test]
    fn test_auto_ctrlr_id_range() {
        let err = ConfigLoader::load_from_toml("[backend]\nauto_ctrlr_id = 4294967295\n").unwrap_err();
        assert!(matches!(err, BridgeError::ConfigError(_)));

        let config = ConfigLoader::load_from_toml("[backend]\nauto_ctrlr_id = -1\n").unwrap();
        assert!(matches!(config.validate(), Err(BridgeError::ConfigError(_))));

        assert_eq!(BridgeConfig::default().backend.auto_ctrlr_id, 0xFFFF);
    }
}
