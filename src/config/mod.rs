//! Configuration model for scanhost.
//!
//! This module defines the Config struct that represents the YAML config file.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use types::{BusyPolicy, MAX_READ_CHUNK_SIZE};
