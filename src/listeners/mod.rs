//! Listener Registry
//!
//! Tracks, per plugin, the event listeners that must be mirrored onto the chat
//! gateway, both before a live connection exists and after. Each plugin's set has its
//! own lock so unrelated plugins never contend on listener updates.

pub(crate) mod error;
pub(crate) mod registry;
pub(crate) mod surface;

pub mod api;
