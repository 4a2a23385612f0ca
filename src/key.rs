//! Lock key derivation.
//!
//! A lock key is `"<prefix>-<owner>/<name>"` with every character outside
//! `[A-Za-z0-9-]` replaced by `-`. The same resource always yields the same
//! key, and the result is a valid name in the lock service's namespace.

use crate::error::{AloneError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Default namespace prefix for lock keys.
pub const DEFAULT_KEY_PREFIX: &str = "rt-alone";

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\-]").expect("Invalid lock key regex"));

/// Coordinates of the contended resource (a repository).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    owner: String,
    name: String,
}

impl ResourceIdentity {
    /// Create an identity from owner and repository name.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        if owner.trim().is_empty() || name.trim().is_empty() {
            return Err(AloneError::UserError(format!(
                "invalid repository coordinates '{}/{}': owner and name must be non-empty",
                owner, name
            )));
        }
        Ok(Self { owner, name })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for ResourceIdentity {
    type Err = AloneError;

    /// Parse `owner/name` coordinates.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name)) if !name.contains('/') => Self::new(owner, name),
            _ => Err(AloneError::UserError(format!(
                "invalid repository coordinates '{}'\n\
                 Fix: use the form 'owner/name' (e.g., 'acme/widgets').",
                s
            ))),
        }
    }
}

/// Normalized name of a resource's lock in the lock service namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey(String);

impl LockKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an already-normalized key, e.g. one read back from the lock store.
    pub fn from_normalized(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() || DISALLOWED.is_match(&key) {
            None
        } else {
            Some(Self(key))
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the lock key for a resource under the given prefix.
pub fn derive_key(prefix: &str, identity: &ResourceIdentity) -> LockKey {
    let raw = format!("{}-{}", prefix, identity);
    LockKey(DISALLOWED.replace_all(&raw, "-").into_owned())
}

/// Check that a prefix survives normalization unchanged.
pub fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && !DISALLOWED.is_match(prefix)
}
