//! Chat Gateway and Database Collaborators
//!
//! The host never speaks the chat platform's protocol or issues SQL. It consumes the
//! narrow surfaces defined here: listener attachment targets before and after the
//! connection exists, a single-use command batch, and a database registrar that plugins
//! register their schema with and the host releases on unload.

pub(crate) mod error;
pub(crate) mod memory;
pub(crate) mod traits;
pub(crate) mod types;

pub mod api;
