//! Process configuration.
//!
//! Loaded from a YAML file, then selectively overridden from the environment
//! (a `.env` file is honoured through `dotenvy`).

use crate::core::{ConfigServerError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "etc/config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigServerConfig {
    pub server: ServerConfig,
    pub vip: VipConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Externally reachable address advertised in generated URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VipConfig {
    pub address: String,
    pub port: u16,
}

impl Default for VipConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

impl StorageBackend {
    fn from_env(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            _ => Err(ConfigServerError::Config(
                "CONFIGSERVER_STORAGE_BACKEND must be one of: memory, file".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Write to this file instead of stderr when non-empty. Rotated files
    /// take the name as prefix plus a date suffix.
    pub filename: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Rotated files to keep, the live one included; 0 keeps all.
    pub max_backups: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filename: None,
            rotation: LogRotation::Daily,
            max_backups: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    pub poll_interval_ms: u64,
    /// Upper bound on the drain phase; 0 waits for in-flight requests forever.
    pub drain_timeout_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            drain_timeout_ms: 0,
        }
    }
}

impl ShutdownConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Option<Duration> {
        (self.drain_timeout_ms > 0).then(|| Duration::from_millis(self.drain_timeout_ms))
    }
}

impl ConfigServerConfig {
    /// Read the YAML file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigServerError::Config(format!("read config file '{}': {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml(&raw)?;
        dotenvy::dotenv().ok();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| ConfigServerError::Config(format!("parse config: {e}")))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(address) = env::var("CONFIGSERVER_ADDRESS") {
            self.server.address = address;
        }
        if let Ok(address) = env::var("CONFIGSERVER_VIP_ADDRESS") {
            self.vip.address = address;
        }
        if let Ok(port) = env::var("CONFIGSERVER_VIP_PORT") {
            self.vip.port = port.parse::<u16>().map_err(|_| {
                ConfigServerError::Config("CONFIGSERVER_VIP_PORT must be a valid u16".to_string())
            })?;
        }
        if let Ok(backend) = env::var("CONFIGSERVER_STORAGE_BACKEND") {
            self.storage.backend = StorageBackend::from_env(&backend)?;
        }
        if let Ok(path) = env::var("CONFIGSERVER_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Ok(level) = env::var("CONFIGSERVER_LOG_LEVEL") {
            self.log.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigServerError::Config(
                "server.address must not be empty".to_string(),
            ));
        }
        if self.vip.address.trim().is_empty() || self.vip.port == 0 {
            return Err(ConfigServerError::Config(
                "vip.address and vip.port must be set".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
            return Err(ConfigServerError::Config(
                "storage.path is required for the file backend".to_string(),
            ));
        }
        if self.shutdown.poll_interval_ms == 0 {
            return Err(ConfigServerError::Config(
                "shutdown.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Base of every URL handed out to proxies.
    pub fn service_address(&self) -> String {
        format!("http://{}:{}", self.vip.address, self.vip.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
server:
  address: "0.0.0.0:8080"
vip:
  address: "10.0.0.1"
  port: 8080
storage:
  backend: file
  path: "data/clusters.json"
log:
  level: debug
  filename: "log/configserver.log"
  rotation: hourly
  max_backups: 24
shutdown:
  poll_interval_ms: 50
  drain_timeout_ms: 3000
"#;

    #[test]
    fn parses_full_yaml() {
        let config = ConfigServerConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.vip.address, "10.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(
            config.storage.path.as_deref(),
            Some(Path::new("data/clusters.json"))
        );
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.rotation, LogRotation::Hourly);
        assert_eq!(config.log.max_backups, 24);
        assert_eq!(config.shutdown.poll_interval(), Duration::from_millis(50));
        assert_eq!(
            config.shutdown.drain_timeout(),
            Some(Duration::from_millis(3000))
        );
        assert_eq!(config.service_address(), "http://10.0.0.1:8080");
        config.validate().unwrap();
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = ConfigServerConfig::from_yaml("vip:\n  address: \"1.2.3.4\"\n").unwrap();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.vip.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.log.rotation, LogRotation::Daily);
        assert!(config.log.filename.is_none());
        assert_eq!(config.shutdown.poll_interval_ms, 100);
        assert_eq!(config.shutdown.drain_timeout(), None);
    }

    #[test]
    fn file_backend_requires_path() {
        let mut config = ConfigServerConfig::default();
        config.storage.backend = StorageBackend::File;
        assert!(matches!(
            config.validate(),
            Err(ConfigServerError::Config(_))
        ));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = ConfigServerConfig::default();
        config.shutdown.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
