//! Listener Registry Errors

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListenerError {
    #[error("Plugin '{plugin_name}' is not registered with the listener registry")]
    NotRegistered { plugin_name: String },

    #[error("A live connection has already been set")]
    ConnectionAlreadySet,

    #[error("{message}")]
    Poisoned { message: String },
}

/// Result type for listener registry operations
pub type ListenerResult<T> = Result<T, ListenerError>;
