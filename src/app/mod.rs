//! Application module

pub mod cli;
pub mod listing;
pub mod startup;
