//! CLI command implementations

pub mod panel;
pub mod settings;
