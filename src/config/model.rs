//! Config struct definition and default implementation.

use crate::key::DEFAULT_KEY_PREFIX;
use serde::{Deserialize, Serialize};

/// Configuration for an alone workspace.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Namespace prefix for lock keys (default: "rt-alone").
    pub key_prefix: String,

    /// Locks older than this are flagged STALE in `lock list`.
    /// Informational only: the gate never expires locks by age.
    pub lock_stale_minutes: u32,

    /// Command template run for each trigger that wins the lock.
    /// Variables: `{repo}`, `{talk}`, `{comment}`, `{author}`.
    pub delegate_command: String,

    /// Maximum delegate run time before it is killed.
    pub delegate_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            lock_stale_minutes: 120,
            delegate_command: String::new(),
            delegate_timeout_seconds: 600,
        }
    }
}
