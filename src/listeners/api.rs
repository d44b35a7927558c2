//! Public API for the listener registry

pub use crate::listeners::error::{ListenerError, ListenerResult};
pub use crate::listeners::registry::ListenerRegistry;
pub use crate::listeners::surface::PluginListeners;
