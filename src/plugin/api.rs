//! Public API for the plugin system
//!
//! External modules should import from here rather than directly from internal modules.

// Contract
pub use crate::plugin::traits::{CommandProvider, Plugin};

// Fault model
pub use crate::plugin::fault::{BoxError, Fault, FaultExt, FaultKind, FaultResult};

// Error handling
pub use crate::plugin::error::{PluginError, PluginResult};

// Plugin metadata and information
pub use crate::plugin::types::{LoadedPlugin, PluginInfo, PluginManifest};

// Discovery
pub use crate::plugin::catalog::{configuration_path, Catalog, CatalogConfig, Discovery};

// Provider table
pub use crate::plugin::provider::{
    LinkedProviders, Provider, ProviderEntry, ProviderFactory, ProviderRegistry, StaticProviders,
};
