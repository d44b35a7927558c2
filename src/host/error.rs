//! Host Error Types
//!
//! Everything here is either an Infrastructure fault (not attributable to a single
//! plugin, aborts `start()`) or misuse of the host API. Plugin faults are values
//! handled at the stage barrier and never become a `HostError`.

use crate::core::error_handling::ContextualError;
use crate::gateway::api::{DatabaseError, GatewayError};
use crate::host::state::HostState;
use crate::listeners::api::ListenerError;

/// Result type alias for host operations
pub type HostResult<T> = std::result::Result<T, HostError>;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The worker pool no longer accepts tasks
    #[error("Worker pool is closed")]
    PoolClosed,

    /// No async runtime is available to run stage tasks
    #[error("Worker pool requires a running Tokio runtime")]
    NoRuntime,

    /// The gateway could not connect or refused the command batch
    #[error("Gateway failure during {operation}: {source}")]
    Gateway {
        operation: &'static str,
        #[source]
        source: GatewayError,
    },

    /// The listener registry failed (poisoned lock, duplicate connection)
    #[error("Listener registry failure: {0}")]
    Listeners(#[from] ListenerError),

    /// A lifecycle call was made in the wrong state
    #[error("Cannot {operation}: host is in state {from}, would move to {to}")]
    InvalidTransition {
        from: HostState,
        to: HostState,
        operation: &'static str,
    },

    /// A plugin asked for a database without declaring `needs_database`
    #[error("Plugin '{plugin_name}' did not declare needs_database")]
    DatabaseNotDeclared { plugin_name: String },

    /// The database registrar rejected a request on behalf of a plugin
    #[error("Database request for plugin '{plugin_name}' failed: {source}")]
    Database {
        plugin_name: String,
        #[source]
        source: DatabaseError,
    },
}

impl HostError {
    /// True for faults that abort startup rather than report misuse
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            HostError::PoolClosed
                | HostError::NoRuntime
                | HostError::Gateway { .. }
                | HostError::Listeners(_)
        )
    }
}

impl ContextualError for HostError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, HostError::Gateway { .. })
    }

    fn user_message(&self) -> Option<String> {
        match self {
            HostError::Gateway { operation, source } => {
                Some(format!("gateway {} failed: {}", operation, source))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_classification() {
        assert!(HostError::PoolClosed.is_infrastructure());
        assert!(HostError::from(ListenerError::ConnectionAlreadySet).is_infrastructure());
        assert!(!HostError::DatabaseNotDeclared {
            plugin_name: "ping".to_string()
        }
        .is_infrastructure());
    }

    #[test]
    fn test_gateway_error_is_user_actionable() {
        let error = HostError::Gateway {
            operation: "connect",
            source: GatewayError::ConnectFailed {
                reason: "invalid token".to_string(),
            },
        };
        assert!(error.is_user_actionable());
        assert!(error.user_message().unwrap().contains("invalid token"));
        assert!(HostError::NoRuntime.user_message().is_none());
    }
}
