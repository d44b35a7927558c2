//! TOML configuration file parsing and loading
//!
//! Handles default config file discovery, parsing and validation of config values.
//!
//! ```toml
//! [host]
//! max_parallelism = 4
//! shutdown_grace_secs = 30
//! close_timeout_secs = 5
//! command_conflict = "first-wins"
//! disabled = ["audit-log"]
//! plugin_config_dir = "/etc/plughost/plugins"
//!
//! [logging]
//! level = "info"
//! format = "ext"
//! file = "/var/log/plughost.log"
//! ```

use crate::core::error_handling::ContextualError;
use crate::host::commands::CommandConflict;
use crate::host::pool::WorkerPool;
use crate::plugin::api::CatalogConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;
const DEFAULT_CLOSE_TIMEOUT_SECS: u64 = 5;

/// Result type alias for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Error reading configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<String> {
        Some(self.to_string())
    }
}

/// Logging settings; unset values fall back to CLI flags or built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<PathBuf>,
}

/// Host configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    /// Upper bound on concurrently running stage tasks
    pub max_parallelism: usize,
    /// How long shutdown waits for in-flight tasks before aborting them
    pub shutdown_grace: Duration,
    /// How long a fatal unload waits for the plugin's `close()`
    pub close_timeout: Duration,
    pub command_conflict: CommandConflict,
    /// Plugins excluded from discovery
    pub disabled: Vec<String>,
    /// Directory holding each plugin's own properties file
    pub plugin_config_dir: PathBuf,
    pub logging: LoggingConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_parallelism: WorkerPool::default_parallelism(),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            close_timeout: Duration::from_secs(DEFAULT_CLOSE_TIMEOUT_SECS),
            command_conflict: CommandConflict::default(),
            disabled: Vec::new(),
            plugin_config_dir: default_config_dir()
                .map(|d| d.join("plugins"))
                .unwrap_or_else(|| PathBuf::from("plugins")),
            logging: LoggingConfig::default(),
        }
    }
}

/// `<config_dir>/plughost`
fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("plughost"))
}

/// `<config_dir>/plughost/plughost.toml`
fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("plughost.toml"))
}

impl HostConfig {
    /// Load configuration. An explicit file must exist; the default file is
    /// optional and its absence yields the defaults.
    pub async fn load(config_file: Option<&Path>) -> ConfigResult<Self> {
        let path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|path| path.exists()),
        };

        let Some(path) = path else {
            log::debug!("No configuration file found, using defaults");
            return Ok(Self::default());
        };

        let contents =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
        let table = toml::from_str::<toml::Table>(&contents).map_err(|source| {
            ConfigError::Parse {
                path: path.clone(),
                source,
            }
        })?;

        let mut config = Self::default();
        config.apply_toml_values(&table)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text on top of the defaults
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let table = toml::from_str::<toml::Table>(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        let mut config = Self::default();
        config.apply_toml_values(&table)?;
        Ok(config)
    }

    /// Apply TOML configuration values over the current settings
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> ConfigResult<()> {
        if let Some(host) = section(config, "host")? {
            if let Some(value) = positive_integer(host, "host.max_parallelism", "max_parallelism")? {
                self.max_parallelism = value as usize;
            }
            if let Some(value) =
                positive_integer(host, "host.shutdown_grace_secs", "shutdown_grace_secs")?
            {
                self.shutdown_grace = Duration::from_secs(value);
            }
            if let Some(value) =
                positive_integer(host, "host.close_timeout_secs", "close_timeout_secs")?
            {
                self.close_timeout = Duration::from_secs(value);
            }
            if let Some(value) = string(host, "host.command_conflict", "command_conflict")? {
                self.command_conflict = value.parse::<CommandConflict>().map_err(|reason| {
                    ConfigError::InvalidValue {
                        key: "host.command_conflict".to_string(),
                        reason,
                    }
                })?;
            }
            // Accepts a single string or an array
            if let Some(value) = host.get("disabled") {
                let mut names = Vec::new();
                if let Some(name) = value.as_str() {
                    names.push(name.to_string());
                } else if let Some(array) = value.as_array() {
                    for item in array {
                        let name = item.as_str().ok_or_else(|| ConfigError::InvalidValue {
                            key: "host.disabled".to_string(),
                            reason: "expected plugin names".to_string(),
                        })?;
                        names.push(name.to_string());
                    }
                } else {
                    return Err(ConfigError::InvalidValue {
                        key: "host.disabled".to_string(),
                        reason: "expected a string or an array of strings".to_string(),
                    });
                }
                for name in names.iter().flat_map(|n| n.split(',')) {
                    let name = name.trim();
                    if !name.is_empty() && !self.disabled.iter().any(|d| d == name) {
                        self.disabled.push(name.to_string());
                    }
                }
            }
            if let Some(value) = string(host, "host.plugin_config_dir", "plugin_config_dir")? {
                self.plugin_config_dir = PathBuf::from(value);
            }
        }

        if let Some(logging) = section(config, "logging")? {
            if let Some(level) = string(logging, "logging.level", "level")? {
                self.logging.level = Some(level.to_string());
            }
            if let Some(format) = string(logging, "logging.format", "format")? {
                self.logging.format = Some(format.to_string());
            }
            if let Some(file) = string(logging, "logging.file", "file")? {
                // "none" and "-" disable file logging
                self.logging.file = if file.eq_ignore_ascii_case("none") || file == "-" {
                    None
                } else {
                    Some(PathBuf::from(file))
                };
            }
        }

        Ok(())
    }

    /// Discovery settings derived from this configuration
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            disabled: self.disabled.clone(),
            plugin_config_dir: self.plugin_config_dir.clone(),
            ..CatalogConfig::default()
        }
    }
}

fn section<'a>(config: &'a toml::Table, name: &str) -> ConfigResult<Option<&'a toml::Table>> {
    match config.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_table()
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: name.to_string(),
                reason: "expected a table".to_string(),
            }),
    }
}

fn string<'a>(table: &'a toml::Table, key: &str, field: &str) -> ConfigResult<Option<&'a str>> {
    match table.get(field) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: "expected a string".to_string(),
            }),
    }
}

fn positive_integer(table: &toml::Table, key: &str, field: &str) -> ConfigResult<Option<u64>> {
    match table.get(field) {
        None => Ok(None),
        Some(value) => match value.as_integer() {
            Some(n) if n > 0 => Ok(Some(n as u64)),
            Some(n) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("must be greater than 0, got {}", n),
            }),
            None => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: "expected an integer".to_string(),
            }),
        },
    }
}
