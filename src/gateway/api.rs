//! Public API for the gateway collaborators

pub use crate::gateway::error::{DatabaseError, DatabaseResult, GatewayError, GatewayResult};
pub use crate::gateway::memory::{MemoryConnection, MemoryDatabase, MemoryGateway, MemoryTarget};
pub use crate::gateway::traits::{
    same_listener, ChatGateway, DatabaseRegistrar, EventListener, ListenerTarget, LiveConnection,
};
pub use crate::gateway::types::{CommandDefinition, CommandOption, DatabaseDescriptor, GatewayEvent};
