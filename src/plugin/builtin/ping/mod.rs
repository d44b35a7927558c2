//! Ping Plugin
//!
//! Contributes the `ping` command and answers invocations of it.

use crate::gateway::api::{CommandDefinition, EventListener, GatewayEvent};
use crate::listeners::api::PluginListeners;
use crate::plugin::api::{BoxError, CommandProvider, FaultExt, FaultResult, Plugin};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

crate::plugin_provider!(include_str!("plugin.toml"), construct);

fn construct() -> Result<Arc<dyn Plugin>, BoxError> {
    let plugin: Arc<dyn Plugin> = Arc::new(Ping::new());
    Ok(plugin)
}

pub struct Ping {
    responder: Arc<Responder>,
}

impl Ping {
    pub fn new() -> Self {
        Self {
            responder: Arc::new(Responder {
                answered: AtomicU64::new(0),
            }),
        }
    }

    /// Number of ping commands answered so far
    pub fn answered(&self) -> u64 {
        self.responder.answered.load(Ordering::Acquire)
    }
}

impl Default for Ping {
    fn default() -> Self {
        Self::new()
    }
}

struct Responder {
    answered: AtomicU64,
}

impl EventListener for Responder {
    fn name(&self) -> &str {
        "ping-responder"
    }

    fn on_event(&self, event: &GatewayEvent) {
        if event.kind != "command" {
            return;
        }
        if event.payload.get("name").and_then(|n| n.as_str()) != Some("ping") {
            return;
        }
        let count = self.answered.fetch_add(1, Ordering::AcqRel) + 1;
        log::info!("pong (#{})", count);
    }
}

#[async_trait::async_trait]
impl Plugin for Ping {
    async fn init(&self, listeners: &PluginListeners) -> FaultResult {
        listeners.add(self.responder.clone()).fatal()?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BoxError> {
        log::debug!("ping: answered {} request(s)", self.answered());
        Ok(())
    }

    fn as_command_provider(&self) -> Option<&dyn CommandProvider> {
        Some(self)
    }
}

impl CommandProvider for Ping {
    fn get_commands(&self) -> Vec<CommandDefinition> {
        vec![CommandDefinition::new("ping", "Check that the bot is responsive")]
    }
}
