//! Shared helpers for the integration tests

#![allow(dead_code)]

use plughost::gateway::api::{MemoryDatabase, MemoryGateway};
use plughost::host::api::{Host, HostConfig};
use plughost::listeners::api::PluginListeners;
use plughost::plugin::api::{Catalog, FaultResult, Plugin, Provider, ProviderRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Host configuration reading plugin properties from `dir`
pub fn config_in(dir: &Path) -> HostConfig {
    HostConfig {
        max_parallelism: 4,
        shutdown_grace: Duration::from_secs(1),
        close_timeout: Duration::from_millis(500),
        plugin_config_dir: dir.to_path_buf(),
        ..HostConfig::default()
    }
}

pub struct TestHost {
    pub host: Host,
    pub gateway: Arc<MemoryGateway>,
    pub database: Arc<MemoryDatabase>,
}

pub fn build_host(registry: impl ProviderRegistry + 'static, config: HostConfig) -> TestHost {
    let gateway = Arc::new(MemoryGateway::new());
    let database = Arc::new(MemoryDatabase::new());
    let catalog = Catalog::new(registry, config.catalog_config());
    let host = Host::new(catalog, gateway.clone(), database.clone(), config)
        .expect("host construction");
    TestHost {
        host,
        gateway,
        database,
    }
}

type Hook = Box<dyn Fn(&str) -> FaultResult + Send + Sync>;

/// Plugin whose `init` runs a closure with the plugin's name
pub struct ClosurePlugin {
    init: Hook,
}

impl ClosurePlugin {
    pub fn new(init: impl Fn(&str) -> FaultResult + Send + Sync + 'static) -> Self {
        Self {
            init: Box::new(init),
        }
    }
}

#[async_trait::async_trait]
impl Plugin for ClosurePlugin {
    async fn init(&self, listeners: &PluginListeners) -> FaultResult {
        (self.init)(listeners.plugin_name())
    }
}

/// Provider for a closure plugin with a minimal manifest
pub fn closure_provider(
    name: &str,
    init: impl Fn(&str) -> FaultResult + Send + Sync + Clone + 'static,
) -> Provider {
    let manifest = format!(
        "name = \"{0}\"\nfriendly_name = \"{0}\"\nversion = \"0.1.0\"\n",
        name
    );
    Provider::new(format!("it::{}", name), manifest, move || {
        let plugin: Arc<dyn Plugin> = Arc::new(ClosurePlugin::new(init.clone()));
        Ok(plugin)
    })
}
