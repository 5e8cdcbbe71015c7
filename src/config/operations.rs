//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::MAX_READ_CHUNK_SIZE;
use crate::error::{HostError, Result};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(HostError::Config)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            HostError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| HostError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| HostError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `library_path` must be non-empty
    /// - `read_chunk_size` must be between 1 and `MAX_READ_CHUNK_SIZE`
    /// - `baseline_command` must not contain NUL bytes
    pub fn validate(&self) -> Result<()> {
        if self.library_path.as_os_str().is_empty() {
            return Err(HostError::Config(
                "config validation failed: library_path must not be empty".to_string(),
            ));
        }

        if self.read_chunk_size == 0 || self.read_chunk_size > MAX_READ_CHUNK_SIZE {
            return Err(HostError::Config(format!(
                "config validation failed: read_chunk_size must be between 1 and {} (found {})",
                MAX_READ_CHUNK_SIZE, self.read_chunk_size
            )));
        }

        if self.baseline_command.contains('\0') {
            return Err(HostError::Config(
                "config validation failed: baseline_command must not contain NUL bytes"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// The baseline command, or `None` when disabled.
    pub fn baseline(&self) -> Option<&str> {
        let command = self.baseline_command.trim();
        (!command.is_empty()).then_some(command)
    }
}
