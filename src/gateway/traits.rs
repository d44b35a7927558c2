//! Collaborator traits consumed by the host and the listener registry

use crate::gateway::error::{DatabaseResult, GatewayResult};
use crate::gateway::types::{CommandDefinition, DatabaseDescriptor, GatewayEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// An object that receives gateway events on behalf of a plugin
pub trait EventListener: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    fn on_event(&self, event: &GatewayEvent);
}

/// Identity comparison for listener handles (data pointer only, vtables may differ
/// between codegen units).
pub fn same_listener(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Somewhere listeners can be attached to: the pre-connection builder surface or the
/// live connection.
pub trait ListenerTarget: Send + Sync {
    fn attach(&self, listener: Arc<dyn EventListener>);

    fn detach(&self, listener: &Arc<dyn EventListener>);
}

/// The live connection to the chat platform
pub trait LiveConnection: ListenerTarget {
    /// Platform session identifier, for logs
    fn session_id(&self) -> String;
}

/// The chat platform as seen by the host
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Listener surface available before a connection exists
    fn pre_connection(&self) -> Arc<dyn ListenerTarget>;

    /// Establish the live connection. Called once per host run.
    async fn connect(&self) -> GatewayResult<Arc<dyn LiveConnection>>;

    /// Submit the merged command batch. Single use.
    async fn submit_commands(&self, batch: Vec<CommandDefinition>) -> GatewayResult<()>;
}

/// Owner of per-plugin database resources
#[async_trait]
pub trait DatabaseRegistrar: Send + Sync {
    async fn register(&self, plugin: &str, descriptor: DatabaseDescriptor) -> DatabaseResult<()>;

    async fn unload(&self, plugin: &str) -> DatabaseResult<()>;
}
