//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{AloneError, Result};
use crate::key::is_valid_prefix;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AloneError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document parses as null rather than an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| AloneError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            AloneError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// - `key_prefix` must be non-empty and only contain `[A-Za-z0-9-]`
    /// - `lock_stale_minutes` and `delegate_timeout_seconds` must be positive
    pub fn validate(&self) -> Result<()> {
        if !is_valid_prefix(&self.key_prefix) {
            return Err(AloneError::UserError(format!(
                "config validation failed: key_prefix '{}' must be non-empty and contain only letters, digits and '-'",
                self.key_prefix
            )));
        }

        if self.lock_stale_minutes == 0 {
            return Err(AloneError::UserError(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        if self.delegate_timeout_seconds == 0 {
            return Err(AloneError::UserError(
                "config validation failed: delegate_timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub fn delegate_timeout(&self) -> Duration {
        Duration::from_secs(self.delegate_timeout_seconds)
    }
}
