//! Plugin Catalog Errors
//!
//! Construction faults raised while turning provider entries into loaded plugins.
//! Each one is scoped to a single provider; discovery of the others continues.

/// Result type alias for catalog operations
pub type PluginResult<T> = std::result::Result<T, PluginError>;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Manifest text could not be parsed or is missing a required key
    #[error("Invalid manifest from provider '{origin}': {reason}")]
    InvalidManifest { origin: String, reason: String },

    /// Manifest `name` does not satisfy the naming rules
    #[error("Invalid plugin name '{plugin_name}': {reason}")]
    InvalidName { plugin_name: String, reason: String },

    /// Manifest `version` is not a semantic version
    #[error("Plugin '{plugin_name}' has invalid version '{version}': {source}")]
    InvalidVersion {
        plugin_name: String,
        version: String,
        #[source]
        source: semver::Error,
    },

    /// Manifest `api_version` does not share the host's major version
    #[error("Plugin '{plugin_name}' targets API version {plugin_api} which is incompatible with host API {host_api}")]
    VersionIncompatible {
        plugin_name: String,
        plugin_api: u32,
        host_api: u32,
    },

    /// Another plugin with the same name was already discovered
    #[error("Plugin '{plugin_name}' is already loaded")]
    DuplicateName { plugin_name: String },

    /// The provider's construction function failed
    #[error("Plugin '{plugin_name}' failed to construct: {cause}")]
    ConstructionFailed { plugin_name: String, cause: String },
}

impl PluginError {
    /// Name of the plugin this error belongs to, when the manifest got that far
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            PluginError::InvalidManifest { .. } => None,
            PluginError::InvalidName { plugin_name, .. }
            | PluginError::InvalidVersion { plugin_name, .. }
            | PluginError::VersionIncompatible { plugin_name, .. }
            | PluginError::DuplicateName { plugin_name }
            | PluginError::ConstructionFailed { plugin_name, .. } => Some(plugin_name),
        }
    }
}
