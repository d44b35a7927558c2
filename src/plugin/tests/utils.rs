//! Plugin Test Utilities
//!
//! A stub plugin and helpers for building provider lists.

use crate::gateway::api::CommandDefinition;
use crate::listeners::api::PluginListeners;
use crate::plugin::api::{BoxError, CommandProvider, FaultResult, Plugin, Provider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Plugin that does nothing, optionally providing commands
#[derive(Default)]
pub struct StubPlugin {
    pub commands: Vec<CommandDefinition>,
}

impl StubPlugin {
    pub fn with_command(mut self, name: &str) -> Self {
        self.commands
            .push(CommandDefinition::new(name, format!("{} command", name)));
        self
    }
}

#[async_trait::async_trait]
impl Plugin for StubPlugin {
    async fn init(&self, _listeners: &PluginListeners) -> FaultResult {
        Ok(())
    }

    fn as_command_provider(&self) -> Option<&dyn CommandProvider> {
        if self.commands.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl CommandProvider for StubPlugin {
    fn get_commands(&self) -> Vec<CommandDefinition> {
        self.commands.clone()
    }
}

pub fn manifest(name: &str, version: &str) -> String {
    format!(
        "name = \"{}\"\nfriendly_name = \"{} plugin\"\nversion = \"{}\"\n",
        name, name, version
    )
}

/// Provider whose factory returns a fresh [`StubPlugin`] and counts invocations
pub fn stub_provider(manifest: String, constructed: Arc<AtomicUsize>) -> Provider {
    Provider::new(format!("tests::{}", constructed.load(Ordering::Relaxed)), manifest, move || {
        constructed.fetch_add(1, Ordering::AcqRel);
        let plugin: Arc<dyn Plugin> = Arc::new(StubPlugin::default());
        Ok(plugin)
    })
}

pub fn simple_provider(name: &str) -> Provider {
    Provider::new(format!("tests::{}", name), manifest(name, "1.0.0"), || {
        let plugin: Arc<dyn Plugin> = Arc::new(StubPlugin::default());
        Ok(plugin)
    })
}

pub fn command_provider(name: &str, command: &str) -> Provider {
    let command = command.to_string();
    Provider::new(format!("tests::{}", name), manifest(name, "1.0.0"), move || {
        let plugin: Arc<dyn Plugin> = Arc::new(StubPlugin::default().with_command(&command));
        Ok(plugin)
    })
}

pub fn panicking_provider(name: &str, message: &'static str) -> Provider {
    Provider::new(format!("tests::{}", name), manifest(name, "1.0.0"), move || {
        panic!("{}", message)
    })
}

pub fn failing_provider(name: &str, reason: &'static str) -> Provider {
    Provider::new(format!("tests::{}", name), manifest(name, "1.0.0"), move || {
        Err::<Arc<dyn Plugin>, BoxError>(reason.into())
    })
}
