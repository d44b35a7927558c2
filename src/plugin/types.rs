//! Type definitions for the plugin system
//!
//! Identity metadata is read from a manifest that ships next to each plugin; the
//! catalog validates it and combines it with the constructed instance into a
//! [`LoadedPlugin`].

use crate::plugin::traits::Plugin;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Raw manifest as written by plugin authors (TOML)
///
/// ```toml
/// name = "ping"
/// friendly_name = "Ping"
/// version = "1.2.0"
/// description = "Latency check command"
/// needs_database = false
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    #[serde(alias = "friendlyName")]
    pub friendly_name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "needsDatabase")]
    pub needs_database: bool,
    #[serde(default, alias = "apiVersion")]
    pub api_version: Option<u32>,
}

impl PluginManifest {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Validated identity of a loaded plugin
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    /// Globally unique, stable identifier
    pub name: String,
    pub friendly_name: String,
    pub version: semver::Version,
    pub description: String,
    /// True when the instance implements the command-provider capability
    pub provides_commands: bool,
    pub needs_database: bool,
    /// Where the plugin keeps its own properties
    pub configuration_path: PathBuf,
    pub api_version: Option<u32>,
}

/// A constructed plugin together with its identity
#[derive(Clone)]
pub struct LoadedPlugin {
    pub info: Arc<PluginInfo>,
    pub instance: Arc<dyn Plugin>,
}

impl LoadedPlugin {
    pub fn name(&self) -> &str {
        &self.info.name
    }
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.info.name)
            .field("version", &self.info.version.to_string())
            .field("provides_commands", &self.info.provides_commands)
            .field("needs_database", &self.info.needs_database)
            .finish()
    }
}
