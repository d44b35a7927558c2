//! Plugin Catalog
//!
//! Turns provider entries into [`LoadedPlugin`]s. Each provider's manifest is parsed
//! and validated (name, friendly name, semantic version, API compatibility) before the
//! instance is constructed. A failure is a construction fault for that one provider;
//! the remaining providers are still discovered.

use crate::core::error_handling::panic_message;
use crate::core::version::{get_api_version, is_api_compatible};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::provider::{Provider, ProviderRegistry};
use crate::plugin::types::{LoadedPlugin, PluginInfo, PluginManifest};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

static PLUGIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("plugin name pattern is valid"));

/// Configuration for discovery
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Plugins to skip
    pub disabled: Vec<String>,
    /// Directory holding each plugin's `<name>.toml` properties
    pub plugin_config_dir: PathBuf,
    /// Host plugin API version checked against manifests that declare one
    pub api_version: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            plugin_config_dir: PathBuf::from("plugins"),
            api_version: get_api_version(),
        }
    }
}

/// Outcome of one discovery pass
#[derive(Debug, Default)]
pub struct Discovery {
    /// Successfully constructed plugins in provider order
    pub plugins: Vec<LoadedPlugin>,
    /// Construction faults, one per failed provider
    pub failures: Vec<PluginError>,
    /// Providers skipped because they are disabled
    pub skipped: Vec<String>,
}

/// Discovers and constructs plugins from a provider registry
pub struct Catalog {
    registry: Box<dyn ProviderRegistry>,
    config: CatalogConfig,
    cached: Mutex<Option<Vec<Provider>>>,
}

impl Catalog {
    pub fn new(registry: impl ProviderRegistry + 'static, config: CatalogConfig) -> Self {
        Self {
            registry: Box::new(registry),
            config,
            cached: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Query providers (cached after the first call) and construct every plugin
    pub fn discover(&self) -> Discovery {
        let providers = self.providers();
        log::debug!("Catalog: {} provider(s) available", providers.len());

        let mut discovery = Discovery::default();
        let mut seen = HashSet::new();

        for provider in &providers {
            let manifest = match self.parse_manifest(provider) {
                Ok(manifest) => manifest,
                Err(error) => {
                    log::error!("Plugin construction failed: {}", error);
                    discovery.failures.push(error);
                    continue;
                }
            };

            if self.config.disabled.iter().any(|d| d == &manifest.name) {
                log::debug!("Catalog: skipping disabled plugin '{}'", manifest.name);
                discovery.skipped.push(manifest.name);
                continue;
            }

            if !seen.insert(manifest.name.clone()) {
                let error = PluginError::DuplicateName {
                    plugin_name: manifest.name,
                };
                log::error!("Plugin construction failed: {}", error);
                discovery.failures.push(error);
                continue;
            }

            match self.construct(provider, manifest) {
                Ok(plugin) => {
                    log::debug!(
                        "Catalog: constructed '{}' v{}",
                        plugin.info.name,
                        plugin.info.version
                    );
                    discovery.plugins.push(plugin);
                }
                Err(error) => {
                    log::error!("Plugin construction failed: {}", error);
                    discovery.failures.push(error);
                }
            }
        }

        log::info!(
            "Catalog: discovered {} plugin(s), {} failed, {} disabled",
            discovery.plugins.len(),
            discovery.failures.len(),
            discovery.skipped.len()
        );
        discovery
    }

    /// Drop the cached provider list so the next `discover()` queries from scratch
    pub fn reload(&self) {
        let mut cached = self.cached.lock().unwrap_or_else(|p| p.into_inner());
        if cached.take().is_some() {
            log::debug!("Catalog: provider cache invalidated");
        }
    }

    fn providers(&self) -> Vec<Provider> {
        let mut cached = self.cached.lock().unwrap_or_else(|p| p.into_inner());
        cached
            .get_or_insert_with(|| self.registry.providers())
            .clone()
    }

    fn parse_manifest(&self, provider: &Provider) -> PluginResult<PluginManifest> {
        let manifest = PluginManifest::from_toml(provider.manifest()).map_err(|e| {
            PluginError::InvalidManifest {
                origin: provider.origin().to_string(),
                reason: e.to_string().trim().to_string(),
            }
        })?;

        validate_name(&manifest.name)?;

        if manifest.friendly_name.trim().is_empty() {
            return Err(PluginError::InvalidManifest {
                origin: provider.origin().to_string(),
                reason: format!("plugin '{}' has an empty friendly_name", manifest.name),
            });
        }

        Ok(manifest)
    }

    fn construct(&self, provider: &Provider, manifest: PluginManifest) -> PluginResult<LoadedPlugin> {
        let version = semver::Version::parse(manifest.version.trim()).map_err(|source| {
            PluginError::InvalidVersion {
                plugin_name: manifest.name.clone(),
                version: manifest.version.clone(),
                source,
            }
        })?;

        if let Some(plugin_api) = manifest.api_version {
            if !is_api_compatible(self.config.api_version, plugin_api) {
                return Err(PluginError::VersionIncompatible {
                    plugin_name: manifest.name,
                    plugin_api,
                    host_api: self.config.api_version,
                });
            }
        }

        let constructed = std::panic::catch_unwind(AssertUnwindSafe(|| provider.construct()))
            .unwrap_or_else(|payload| Err(format!("panicked: {}", panic_message(payload)).into()));
        let instance = constructed.map_err(|cause| PluginError::ConstructionFailed {
            plugin_name: manifest.name.clone(),
            cause: cause.to_string(),
        })?;

        let info = PluginInfo {
            configuration_path: configuration_path(&self.config.plugin_config_dir, &manifest.name),
            provides_commands: instance.as_command_provider().is_some(),
            name: manifest.name,
            friendly_name: manifest.friendly_name,
            version,
            description: manifest.description.unwrap_or_default(),
            needs_database: manifest.needs_database,
            api_version: manifest.api_version,
        };

        Ok(LoadedPlugin {
            info: Arc::new(info),
            instance,
        })
    }
}

fn validate_name(name: &str) -> PluginResult<()> {
    if PLUGIN_NAME.is_match(name) {
        Ok(())
    } else {
        Err(PluginError::InvalidName {
            plugin_name: name.to_string(),
            reason: "must be lowercase alphanumerics, '-' or '_', starting with a letter or digit"
                .to_string(),
        })
    }
}

/// `<plugin_config_dir>/<name>.toml`
pub fn configuration_path(plugin_config_dir: &Path, name: &str) -> PathBuf {
    plugin_config_dir.join(format!("{}.toml", name))
}
