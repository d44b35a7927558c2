//! Plugin Contract
//!
//! Every extension implements [`Plugin`]. The host drives the hooks in a fixed order,
//! each stage running concurrently across plugins and joining before the next:
//!
//! 1. `pre_init` - early setup; the plugin's listener surface is available
//! 2. `init` - register listeners with the gateway
//! 3. `post_init` - the live connection exists; register database needs
//! 4. `on_ready` - commands have been submitted, the host is serving
//!
//! A hook reports failure by returning a [`Fault`](crate::plugin::fault::Fault).
//! `close` is called once at unload or shutdown; its failure is logged only.
//!
//! Plugins that contribute slash commands also implement [`CommandProvider`] and
//! return `Some(self)` from [`Plugin::as_command_provider`].

use crate::gateway::api::CommandDefinition;
use crate::host::api::HostHandle;
use crate::listeners::api::PluginListeners;
use crate::plugin::fault::{BoxError, FaultResult};

/// Base trait that all plugins implement
///
/// Hooks take `&self`; a plugin that needs mutable state keeps it behind its own
/// lock since the same instance is shared with worker tasks.
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
    /// First stage. May register listeners through `listeners`.
    async fn pre_init(&self, _listeners: &PluginListeners) -> FaultResult {
        Ok(())
    }

    /// Second stage. Listener registration normally happens here.
    async fn init(&self, listeners: &PluginListeners) -> FaultResult;

    /// Third stage, after the gateway connected.
    async fn post_init(&self, _host: &HostHandle) -> FaultResult {
        Ok(())
    }

    /// Final stage, after the command batch was submitted.
    async fn on_ready(&self, _host: &HostHandle) -> FaultResult {
        Ok(())
    }

    /// Release resources. Errors are logged and never escalated.
    async fn close(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Return self as a command provider if this plugin implements that capability
    fn as_command_provider(&self) -> Option<&dyn CommandProvider> {
        None
    }
}

/// Capability of plugins that contribute commands to the gateway's command batch
pub trait CommandProvider: Send + Sync {
    /// Commands in the order they should be submitted
    fn get_commands(&self) -> Vec<CommandDefinition>;
}
