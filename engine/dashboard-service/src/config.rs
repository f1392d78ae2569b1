//! Service configuration management

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while building the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid log level: {0}")]
    LogLevel(String),

    #[error("Invalid log format: {0}")]
    LogFormat(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid server address: {0}")]
    Address(#[from] std::net::AddrParseError),
}

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// HTTP server configuration
    pub server: ServerSettings,

    /// Source data locations
    pub data: DataSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

/// Source data locations, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Price CSV with a `Date` column
    pub prices_path: PathBuf,

    /// Four-column events CSV
    pub events_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,

    /// Log file path (if None, logs to stdout)
    pub file: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 5000 }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            prices_path: PathBuf::from("data/brent_cleaned.csv"),
            events_path: PathBuf::from("events/events.csv"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string(), file: None }
    }
}

impl DashboardConfig {
    /// Get the server address
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }

    /// Load configuration from a TOML file; missing sections keep defaults
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override settings from `DASHBOARD_*` variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DASHBOARD_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("DASHBOARD_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "DASHBOARD_PORT", value: port })?;
        }

        if let Some(path) = lookup("DASHBOARD_PRICES_PATH") {
            self.data.prices_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("DASHBOARD_EVENTS_PATH") {
            self.data.events_path = PathBuf::from(path);
        }

        if let Some(level) = lookup("DASHBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("DASHBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(file) = lookup("DASHBOARD_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::LogLevel(other.to_string())),
        }

        match self.logging.format.as_str() {
            "json" | "pretty" | "compact" => {}
            other => return Err(ConfigError::LogFormat(other.to_string())),
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue { key: "port", value: "0".to_string() });
        }

        self.server_addr()?;
        Ok(())
    }
}

/// Load configuration from an optional file, then the process environment
pub fn load_config(config_file: Option<&Path>) -> Result<DashboardConfig, ConfigError> {
    let mut config = match config_file {
        Some(path) => {
            tracing::debug!("Loading configuration from file: {:?}", path);
            DashboardConfig::load_from_file(path)?
        }
        None => DashboardConfig::default(),
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}
