//! Audit event log.
//!
//! Lock calls made by `alone process` and `alone lock clear` are appended as
//! NDJSON (one JSON object per line) to `.alone/events/events.ndjson`:
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: `self_heal`, `acquire`, `defer`, `release`, `fail` or `lock_clear`
//! - `actor`: the owner string (e.g., `user@HOST`)
//! - `resource`: repository coordinates, when known
//! - `details`: freeform object (key, holder, outcome, ...)

use crate::context::Workspace;
use crate::error::{AloneError, Result};
use crate::lock::owner_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Release issued because the work item showed no active work.
    SelfHeal,
    /// Lock acquired, delegate invoked.
    Acquire,
    /// Lock busy, trigger deferred.
    Defer,
    /// Lock released after an empty delegate result.
    Release,
    /// Processing stopped with an error.
    Fail,
    /// Lock file removed by an operator.
    LockClear,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventAction::SelfHeal => "self_heal",
            EventAction::Acquire => "acquire",
            EventAction::Defer => "defer",
            EventAction::Release => "release",
            EventAction::Fail => "fail",
            EventAction::LockClear => "lock_clear",
        };
        f.write_str(name)
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,
    pub action: EventAction,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub details: Value,
}

impl Event {
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: owner_string(),
            resource: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            AloneError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

pub fn events_file_path(ws: &Workspace) -> PathBuf {
    ws.events_dir.join("events.ndjson")
}

/// Append an event to the events log, creating the file if needed.
pub fn append_event(ws: &Workspace, event: &Event) -> Result<()> {
    let events_file = events_file_path(ws);
    let json_line = event.to_ndjson_line()?;

    fs::create_dir_all(&ws.events_dir).map_err(|e| {
        AloneError::UserError(format!(
            "failed to create events directory '{}': {}",
            ws.events_dir.display(),
            e
        ))
    })?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            AloneError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        AloneError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        AloneError::UserError(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })
}
