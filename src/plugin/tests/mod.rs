//! Test modules for the plugin system
//!
//! Catalog discovery against explicit provider lists and the linked builtins.

mod utils;
