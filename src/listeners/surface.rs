//! Plugin-scoped listener surface handed to lifecycle hooks

use crate::gateway::api::EventListener;
use crate::listeners::error::ListenerResult;
use crate::listeners::registry::ListenerRegistry;
use std::sync::Arc;

/// A plugin's view of the listener registry. Everything it adds is tracked under its
/// own name and detached automatically when the plugin is unloaded.
#[derive(Clone)]
pub struct PluginListeners {
    plugin: String,
    registry: Arc<ListenerRegistry>,
}

impl PluginListeners {
    pub fn new(plugin: impl Into<String>, registry: Arc<ListenerRegistry>) -> Self {
        Self {
            plugin: plugin.into(),
            registry,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    /// Add one listener; false if it was already registered
    pub fn add(&self, listener: Arc<dyn EventListener>) -> ListenerResult<bool> {
        self.add_all([listener]).map(|added| added == 1)
    }

    pub fn add_all<I>(&self, listeners: I) -> ListenerResult<usize>
    where
        I: IntoIterator<Item = Arc<dyn EventListener>>,
    {
        self.registry.add_listeners(&self.plugin, listeners)
    }

    /// Remove one listener; false if it was not registered
    pub fn remove(&self, listener: &Arc<dyn EventListener>) -> ListenerResult<bool> {
        self.registry
            .remove_listeners(&self.plugin, [listener])
            .map(|removed| removed == 1)
    }

    pub fn count(&self) -> usize {
        self.registry.listener_count(&self.plugin).unwrap_or(0)
    }
}

impl std::fmt::Debug for PluginListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginListeners")
            .field("plugin", &self.plugin)
            .field("count", &self.count())
            .finish()
    }
}
