//! Workspace layout resolution for alone.
//!
//! Every command works against a workspace root (default: the current
//! directory). State lives under `{root}/.alone/`:
//!
//! ```text
//! .alone/
//!   config.yaml
//!   locks/      one <key>.lock file per held lock
//!   talks/      one <work_item>.yaml per talk
//!   events/     events.ndjson audit log
//!   logs/       delegate stdout/stderr per talk
//! ```

use crate::error::{AloneError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// State directory name within the workspace root.
pub const STATE_DIR: &str = ".alone";

/// Resolved absolute paths for an alone workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub locks_dir: PathBuf,
    pub talks_dir: PathBuf,
    pub events_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl Workspace {
    /// Resolve the workspace from `root`, or from the current working
    /// directory when `None`.
    pub fn resolve(root: Option<&Path>) -> Result<Self> {
        match root {
            Some(root) => Self::resolve_from(root),
            None => {
                let cwd = env::current_dir().map_err(|e| {
                    AloneError::UserError(format!(
                        "failed to get current working directory: {}",
                        e
                    ))
                })?;
                Self::resolve_from(cwd)
            }
        }
    }

    pub fn resolve_from<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            env::current_dir()
                .map_err(|e| {
                    AloneError::UserError(format!(
                        "failed to get current working directory: {}",
                        e
                    ))
                })?
                .join(root)
        };

        let state_dir = root.join(STATE_DIR);
        Ok(Self {
            locks_dir: state_dir.join("locks"),
            talks_dir: state_dir.join("talks"),
            events_dir: state_dir.join("events"),
            logs_dir: state_dir.join("logs"),
            state_dir,
            root,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.yaml")
    }

    pub fn is_initialized(&self) -> bool {
        self.state_dir.is_dir()
    }

    /// Fail with an actionable error unless `alone init` has been run.
    pub fn require_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(AloneError::UserError(format!(
                "no alone workspace at '{}'\n\
                 Fix: run `alone init` (or pass --root).",
                self.root.display()
            )))
        }
    }
}
