//! Host Module
//!
//! The orchestrator that sequences plugin lifecycle stages over a bounded worker
//! pool, contains plugin faults at each stage barrier, aggregates commands and
//! performs a bounded-time shutdown.

// Internal modules - all access should go through api module
pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod error;
#[allow(clippy::module_inception)]
pub(crate) mod host;
pub(crate) mod pool;
pub(crate) mod records;
pub(crate) mod stage;
pub(crate) mod state;
pub(crate) mod table;

// Public API module - the only public interface for the host
pub mod api;

#[cfg(test)]
pub(crate) mod tests;
