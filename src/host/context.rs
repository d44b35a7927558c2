//! Host handle passed to `post_init` and `on_ready`

use crate::gateway::api::{DatabaseDescriptor, DatabaseRegistrar, LiveConnection};
use crate::host::error::{HostError, HostResult};
use crate::host::table::PluginTable;
use crate::listeners::api::{ListenerRegistry, PluginListeners};
use crate::plugin::api::{LoadedPlugin, PluginInfo};
use std::sync::Arc;

/// A plugin's reference to the host, scoped to that plugin
#[derive(Clone)]
pub struct HostHandle {
    info: Arc<PluginInfo>,
    listeners: PluginListeners,
    registry: Arc<ListenerRegistry>,
    database: Arc<dyn DatabaseRegistrar>,
    table: PluginTable,
}

impl HostHandle {
    pub(crate) fn new(
        plugin: &LoadedPlugin,
        registry: Arc<ListenerRegistry>,
        database: Arc<dyn DatabaseRegistrar>,
        table: PluginTable,
    ) -> Self {
        Self {
            info: plugin.info.clone(),
            listeners: PluginListeners::new(plugin.name(), registry.clone()),
            registry,
            database,
            table,
        }
    }

    /// Identity of the plugin holding this handle
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// The plugin's listener surface
    pub fn listeners(&self) -> &PluginListeners {
        &self.listeners
    }

    /// The live gateway connection, once established
    pub fn connection(&self) -> Option<Arc<dyn LiveConnection>> {
        self.registry.connection()
    }

    /// Ask the registrar to provision this plugin's database.
    /// Only plugins that declared `needs_database` may do so.
    pub async fn register_database(&self, descriptor: DatabaseDescriptor) -> HostResult<()> {
        if !self.info.needs_database {
            return Err(HostError::DatabaseNotDeclared {
                plugin_name: self.info.name.clone(),
            });
        }
        log::debug!(
            "Host: registering database schema '{}' for '{}'",
            descriptor.schema,
            self.info.name
        );
        self.database
            .register(&self.info.name, descriptor)
            .await
            .map_err(|source| HostError::Database {
                plugin_name: self.info.name.clone(),
                source,
            })
    }

    /// Names of the plugins still loaded
    pub async fn loaded_plugins(&self) -> Vec<String> {
        self.table.names().await
    }
}

impl std::fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHandle")
            .field("plugin", &self.info.name)
            .finish_non_exhaustive()
    }
}
