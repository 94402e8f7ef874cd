//! Shared types, configuration, and error handling for the Pushcast workspace.

pub mod config;
pub mod error;
pub mod transport;
pub mod types;
