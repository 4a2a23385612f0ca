//! File-backed lock service.
//!
//! Lock files live in `.alone/locks/<key>.lock`. They are published with an
//! exclusive hard link from a fully written temp file, so on a shared
//! filesystem only one process can hold a given key at a time and no reader
//! ever sees a half-written lock.
//!
//! Each lock file contains JSON metadata:
//! - `holder`: the work item the lock was taken for
//! - `owner`: the machine-level owner (e.g., `user@HOST`)
//! - `pid`: the process ID (optional)
//! - `created_at`: RFC3339 timestamp

use super::LockService;
use crate::error::{AloneError, Result};
use crate::key::LockKey;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock metadata stored in lock files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Work item the lock is held for.
    pub holder: String,

    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Timestamp when the lock was created (RFC3339).
    pub created_at: DateTime<Utc>,
}

impl LockMetadata {
    /// Create new lock metadata with the current timestamp.
    pub fn new(holder: &str) -> Self {
        Self {
            holder: holder.to_string(),
            owner: owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
        }
    }

    /// Parse lock metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AloneError::LockService(format!(
                "failed to read lock file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&content).map_err(|e| {
            AloneError::LockService(format!(
                "failed to parse lock file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize lock metadata to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            AloneError::LockService(format!("failed to serialize lock metadata: {}", e))
        })
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    /// Check if the lock is older than the given threshold in minutes.
    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.age().num_minutes() > stale_minutes as i64
    }
}

/// Owner string for lock metadata.
pub(crate) fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Information about an existing lock file.
#[derive(Debug, Clone)]
pub struct LockInfo {
    pub path: PathBuf,
    pub key: LockKey,
    /// `None` when the file could not be parsed.
    pub metadata: Option<LockMetadata>,
    pub is_stale: bool,
}

impl LockInfo {
    pub fn is_corrupt(&self) -> bool {
        self.metadata.is_none()
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.metadata {
            Some(metadata) => write!(
                f,
                "{} (holder: {}, owner: {}, age: {}{})",
                self.key,
                metadata.holder,
                metadata.owner,
                metadata.age_string(),
                if self.is_stale { ", STALE" } else { "" }
            ),
            None => write!(f, "{} (holder: unknown, CORRUPT)", self.key),
        }
    }
}

/// Distinguishes temp files of concurrent acquires within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Lock service storing one exclusive file per key.
///
/// A lock file only ever appears fully written: metadata goes to a private
/// temp file first, which is then hard-linked to `<key>.lock`. The link
/// fails with `AlreadyExists` when the key is held.
#[derive(Debug, Clone)]
pub struct FileLockService {
    locks_dir: PathBuf,
}

impl FileLockService {
    pub fn new(locks_dir: impl Into<PathBuf>) -> Self {
        Self {
            locks_dir: locks_dir.into(),
        }
    }

    pub fn lock_path(&self, key: &LockKey) -> PathBuf {
        self.locks_dir.join(format!("{}.lock", key))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.locks_dir).map_err(|e| {
            AloneError::LockService(format!(
                "failed to create locks directory '{}': {}",
                self.locks_dir.display(),
                e
            ))
        })
    }

    fn temp_path(&self, key: &LockKey) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.locks_dir
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), n))
    }

    /// List all lock files, sorted by key.
    ///
    /// Lock files whose metadata cannot be parsed are listed as corrupt.
    pub fn list(&self, stale_minutes: u32) -> Result<Vec<LockInfo>> {
        let mut locks = Vec::new();

        if !self.locks_dir.exists() {
            return Ok(locks);
        }

        let entries = fs::read_dir(&self.locks_dir).map_err(|e| {
            AloneError::LockService(format!(
                "failed to read locks directory '{}': {}",
                self.locks_dir.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                AloneError::LockService(format!("failed to read locks directory entry: {}", e))
            })?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(LockKey::from_normalized)
            else {
                continue;
            };

            let metadata = LockMetadata::from_file(&path).ok();
            let is_stale = metadata.as_ref().is_some_and(|m| m.is_stale(stale_minutes));
            locks.push(LockInfo {
                path,
                key,
                metadata,
                is_stale,
            });
        }

        locks.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(locks)
    }

    /// Remove a lock file regardless of its holder or content.
    ///
    /// The caller is responsible for verifying that clearing the lock is
    /// appropriate (e.g., checking --force). Returns what was removed; a
    /// corrupt file is removed too and reported without metadata.
    pub fn clear(&self, key: &LockKey, stale_minutes: u32) -> Result<LockInfo> {
        let path = self.lock_path(key);
        if !path.exists() {
            return Err(AloneError::UserError(format!(
                "lock '{}' does not exist at: {}",
                key,
                path.display()
            )));
        }

        let metadata = LockMetadata::from_file(&path).ok();
        let is_stale = metadata.as_ref().is_some_and(|m| m.is_stale(stale_minutes));

        fs::remove_file(&path).map_err(|e| {
            AloneError::LockService(format!(
                "failed to clear lock '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(LockInfo {
            path,
            key: key.clone(),
            metadata,
            is_stale,
        })
    }
}

impl LockService for FileLockService {
    fn acquire(&self, key: &LockKey, holder: &str) -> Result<bool> {
        self.ensure_dir()?;
        let path = self.lock_path(key);
        let temp_path = self.temp_path(key);

        let json = LockMetadata::new(holder).to_json()?;
        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .and_then(|mut file| {
                file.write_all(json.as_bytes())?;
                file.sync_all()
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(AloneError::LockService(format!(
                "failed to write lock metadata '{}': {}",
                temp_path.display(),
                e
            )));
        }

        let linked = fs::hard_link(&temp_path, &path);
        let _ = fs::remove_file(&temp_path);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(AloneError::LockService(format!(
                "failed to acquire lock '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn release(&self, key: &LockKey, holder: &str) -> Result<()> {
        let path = self.lock_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(AloneError::LockService(format!(
                    "failed to read lock file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let metadata = LockMetadata::from_json(&content).map_err(|e| {
            AloneError::LockService(format!(
                "failed to parse lock file '{}': {}\n\
                 Fix: inspect the file, then run `alone lock clear {} --force`.",
                path.display(),
                e,
                key
            ))
        })?;
        if metadata.holder != holder {
            tracing::debug!(
                key = %key,
                holder,
                current = %metadata.holder,
                "lock held by another work item, not releasing"
            );
            return Ok(());
        }

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AloneError::LockService(format!(
                "failed to release lock '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}
