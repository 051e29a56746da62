//! Server configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! command-line overrides.

use crate::error::ConfigError;
use crate::expand_path;
use crate::session::DEFAULT_MAX_CLIENTS;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_REPOSITORY: &str = "server_repository";

/// Relay server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Interface to listen on.
    pub bind_addr: String,
    /// TCP port; 0 picks an ephemeral port.
    pub port: u16,
    /// Maximum concurrent sessions.
    pub max_clients: usize,
    /// Directory served by `list` and `GET_FILE:`.
    pub repository: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            repository: PathBuf::from(DEFAULT_REPOSITORY),
        }
    }
}

/// Command-line values that replace file or default settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
    pub max_clients: Option<usize>,
    pub repository: Option<String>,
}

impl RelayConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.repository = expand_path(&config.repository.to_string_lossy());
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source, &path.display().to_string())
    }

    /// Build the effective configuration and validate it.
    pub fn load(file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(bind_addr) = overrides.bind_addr {
            self.bind_addr = bind_addr;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(max_clients) = overrides.max_clients {
            self.max_clients = max_clients;
        }
        if let Some(repository) = overrides.repository {
            self.repository = expand_path(&repository);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid(
                "max_clients must be at least 1".to_string(),
            ));
        }
        self.socket_addr()?;
        Ok(())
    }

    /// Listen address built from `bind_addr` and `port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_addr.trim().parse().map_err(|e| {
            ConfigError::Invalid(format!("invalid bind address {:?}: {e}", self.bind_addr))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
