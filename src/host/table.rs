//! Host plugin table
//!
//! Insertion-ordered list of loaded plugins behind an async lock. It is filled once
//! at construction; afterwards membership only shrinks (fatal unload, shutdown).
//! Stage fan-out iterates a snapshot so unloads never race an iteration.

use crate::plugin::api::LoadedPlugin;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe shared plugin table
#[derive(Debug, Clone, Default)]
pub struct PluginTable {
    inner: Arc<RwLock<Vec<LoadedPlugin>>>,
}

impl PluginTable {
    pub fn new(plugins: Vec<LoadedPlugin>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(plugins)),
        }
    }

    /// Copy of the current membership, in load order
    pub async fn snapshot(&self) -> Vec<LoadedPlugin> {
        self.inner.read().await.clone()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.iter().any(|p| p.name() == name)
    }

    pub async fn get(&self, name: &str) -> Option<LoadedPlugin> {
        self.inner
            .read()
            .await
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Remove `name`, returning it if it was still loaded
    pub async fn remove(&self, name: &str) -> Option<LoadedPlugin> {
        let mut plugins = self.inner.write().await;
        let index = plugins.iter().position(|p| p.name() == name)?;
        Some(plugins.remove(index))
    }

    /// Empty the table, returning what was loaded
    pub async fn clear(&self) -> Vec<LoadedPlugin> {
        std::mem::take(&mut *self.inner.write().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::tests::utils::{loaded, ScriptedPlugin};

    #[tokio::test]
    async fn test_remove_preserves_order_of_the_rest() {
        let table = PluginTable::new(vec![
            loaded("a", ScriptedPlugin::new()),
            loaded("b", ScriptedPlugin::new()),
            loaded("c", ScriptedPlugin::new()),
        ]);

        assert_eq!(table.remove("b").await.map(|p| p.name().to_string()), Some("b".to_string()));
        assert!(table.remove("b").await.is_none());
        assert_eq!(table.names().await, vec!["a", "c"]);
        assert!(table.contains("c").await);
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_later_removal() {
        let table = PluginTable::new(vec![loaded("a", ScriptedPlugin::new())]);
        let snapshot = table.snapshot().await;

        table.clear().await;
        assert_eq!(snapshot.len(), 1);
        assert!(table.is_empty().await);
    }
}
