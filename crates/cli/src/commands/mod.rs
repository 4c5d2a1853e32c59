//! Subcommand implementations

pub mod diff;
pub mod nodes;
pub mod pods;
pub mod quantity;
pub mod revise;
