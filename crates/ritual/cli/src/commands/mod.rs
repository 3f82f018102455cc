//! CLI commands

pub mod ritual;
pub mod walk;
