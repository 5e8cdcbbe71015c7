//! Config enums, limits and serde default functions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest accepted `read_chunk_size` (1 MiB).
pub const MAX_READ_CHUNK_SIZE: usize = 1024 * 1024;

/// What to do when standard output is already claimed by another call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Fail immediately with a busy error (default).
    #[default]
    Reject,
    /// Block until the other call finishes.
    Wait,
}

impl BusyPolicy {
    /// Parse a busy policy from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reject" => Some(Self::Reject),
            "wait" => Some(Self::Wait),
            _ => None,
        }
    }
}

// Default value functions for serde
pub(crate) fn default_library_path() -> PathBuf {
    PathBuf::from("libscanmem.so")
}
pub(crate) fn default_baseline_command() -> String {
    "reset".to_string()
}
pub(crate) fn default_read_chunk_size() -> usize {
    4096
}
