//! Built-in Plugin Implementations
//!
//! Plugins that ship with the host. Each one registers itself in the provider
//! table from its own module, next to its `plugin.toml` manifest.

pub mod audit_log;
pub mod greeter;
pub mod ping;
