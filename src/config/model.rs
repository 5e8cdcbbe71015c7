//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for scanhost.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Engine settings
    // =========================================================================
    /// Shared library to load (default: "libscanmem.so", resolved by the dynamic loader).
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,

    /// Command sent once right after `sm_init` (default: "reset"). Empty disables it.
    #[serde(default = "default_baseline_command")]
    pub baseline_command: String,

    // =========================================================================
    // Capture settings
    // =========================================================================
    /// Bytes requested per read while draining captured output.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    /// Behavior when another call already owns standard output.
    #[serde(default)]
    pub busy_policy: BusyPolicy,

    // =========================================================================
    // Journal settings
    // =========================================================================
    /// NDJSON file that records every executed command. Unset disables journaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_path: default_library_path(),
            baseline_command: default_baseline_command(),
            read_chunk_size: default_read_chunk_size(),
            busy_policy: BusyPolicy::default(),
            journal_path: None,
        }
    }
}
