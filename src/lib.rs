pub mod app;
pub mod core;
pub mod gateway;
pub mod host;
pub mod listeners;
pub mod plugin;

// Reached by `plugin_provider!` expansions
#[doc(hidden)]
pub use inventory;
