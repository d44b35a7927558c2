//! Public API for the host
//!
//! External modules should import from here rather than directly from internal modules.

// Orchestrator
pub use crate::host::host::Host;

// Plugin-facing handle
pub use crate::host::context::HostHandle;

// Lifecycle
pub use crate::host::state::{HostState, Stage};

// Error handling and fault records
pub use crate::host::error::{HostError, HostResult};
pub use crate::host::records::{FaultClass, FaultRecord};

// Configuration
pub use crate::host::commands::CommandConflict;
pub use crate::host::config::{ConfigError, ConfigResult, HostConfig, LoggingConfig};

// Worker pool
pub use crate::host::pool::{ShutdownReport, WorkerPool};
