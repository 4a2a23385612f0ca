//! Work item state snapshots.
//!
//! The gate asks one question of persisted state: is there an unresolved
//! request or a running daemon for this work item? Any store that can answer
//! it implements [`StateSource`]. The bundled [`FileStateSource`] reads talk
//! documents from `.alone/talks/<work_item>.yaml`:
//!
//! ```yaml
//! name: acme-widgets-42
//! request:
//!   id: 5f1c
//!   command: deploy
//! daemon:
//!   started: 2026-10-18T09:12:00Z
//! ```

use crate::error::{AloneError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Point-in-time view of a work item's persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Stable identifier of the work item; labels the lock it holds.
    pub name: String,
    pub has_active_or_pending_work: bool,
}

/// Read-only source of work item snapshots.
pub trait StateSource {
    fn read(&self, work_item: &str) -> Result<StateSnapshot>;
}

impl<S: StateSource + ?Sized> StateSource for &S {
    fn read(&self, work_item: &str) -> Result<StateSnapshot> {
        (**self).read(work_item)
    }
}

/// An unresolved request recorded on a talk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A daemon process started for a talk and not yet finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Daemon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
}

/// Persisted talk document. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalkDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<Daemon>,
}

impl TalkDocument {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let doc: TalkDocument = serde_yaml::from_str(yaml)
            .map_err(|e| AloneError::StateRead(format!("failed to parse talk YAML: {}", e)))?;
        if doc.name.trim().is_empty() {
            return Err(AloneError::StateRead(
                "talk document has an empty 'name'".to_string(),
            ));
        }
        Ok(doc)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AloneError::UserError(format!("failed to serialize talk to YAML: {}", e)))
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            name: self.name.clone(),
            has_active_or_pending_work: self.request.is_some() || self.daemon.is_some(),
        }
    }
}

/// Reads talk documents from a directory.
#[derive(Debug, Clone)]
pub struct FileStateSource {
    talks_dir: PathBuf,
}

impl FileStateSource {
    pub fn new(talks_dir: impl Into<PathBuf>) -> Self {
        Self {
            talks_dir: talks_dir.into(),
        }
    }

    pub fn talk_path(&self, work_item: &str) -> PathBuf {
        self.talks_dir.join(format!("{}.yaml", work_item))
    }

    fn load(&self, path: &Path) -> Result<TalkDocument> {
        let content = fs::read_to_string(path).map_err(|e| {
            AloneError::StateRead(format!(
                "failed to read talk file '{}': {}",
                path.display(),
                e
            ))
        })?;
        TalkDocument::from_yaml(&content).map_err(|e| match e {
            AloneError::StateRead(msg) => {
                AloneError::StateRead(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }
}

impl StateSource for FileStateSource {
    fn read(&self, work_item: &str) -> Result<StateSnapshot> {
        if work_item.is_empty() || work_item.contains(['/', '\\']) || work_item.starts_with('.') {
            return Err(AloneError::StateRead(format!(
                "invalid work item name '{}'",
                work_item
            )));
        }
        Ok(self.load(&self.talk_path(work_item))?.snapshot())
    }
}
