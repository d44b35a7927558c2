//! Audit Log Plugin
//!
//! Records every gateway event it sees. Needs a database: the `audit` schema is
//! registered during post-init, and a failure to do so is fatal for the plugin.

use crate::gateway::api::{DatabaseDescriptor, EventListener, GatewayEvent};
use crate::host::api::HostHandle;
use crate::listeners::api::PluginListeners;
use crate::plugin::api::{BoxError, FaultExt, FaultResult, Plugin};
use std::sync::{Arc, Mutex};

crate::plugin_provider!(include_str!("plugin.toml"), construct);

fn construct() -> Result<Arc<dyn Plugin>, BoxError> {
    let plugin: Arc<dyn Plugin> = Arc::new(AuditLog::new());
    Ok(plugin)
}

pub struct AuditLog {
    recorder: Arc<Recorder>,
}

#[derive(Default)]
struct Recorder {
    kinds: Mutex<Vec<String>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            recorder: Arc::new(Recorder::default()),
        }
    }

    pub fn descriptor() -> DatabaseDescriptor {
        DatabaseDescriptor::new("audit").with_table("events")
    }

    /// Kinds of the events recorded so far
    pub fn recorded(&self) -> Vec<String> {
        self.recorder
            .kinds
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventListener for Recorder {
    fn name(&self) -> &str {
        "audit-recorder"
    }

    fn on_event(&self, event: &GatewayEvent) {
        self.kinds
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event.kind.clone());
    }
}

#[async_trait::async_trait]
impl Plugin for AuditLog {
    // Record from the earliest point, including events seen before connect
    async fn pre_init(&self, listeners: &PluginListeners) -> FaultResult {
        listeners.add(self.recorder.clone()).fatal()?;
        Ok(())
    }

    async fn init(&self, _listeners: &PluginListeners) -> FaultResult {
        Ok(())
    }

    async fn post_init(&self, host: &HostHandle) -> FaultResult {
        host.register_database(Self::descriptor()).await.fatal()?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BoxError> {
        log::debug!("audit-log: {} event(s) recorded", self.recorded().len());
        Ok(())
    }
}
