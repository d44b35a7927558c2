//! Plugin System Module
//!
//! The contract every extension implements, the fault model its hooks report
//! through, and the catalog that discovers providers and constructs plugins.

// Internal modules - all access should go through api module
pub(crate) mod builtin;
pub(crate) mod catalog;
pub(crate) mod error;
pub(crate) mod fault;
pub(crate) mod provider;
pub(crate) mod traits;
pub(crate) mod types;

// Public API module - the only public interface for the plugin system
pub mod api;

#[cfg(test)]
mod tests;
