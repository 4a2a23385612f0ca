//! Implementation of the `alone init` command.
//!
//! Creates `.alone/` with `locks/`, `talks/`, `events/` and `logs/`, and
//! writes a default `config.yaml` if none exists. Idempotent: an existing
//! config is never overwritten.

use crate::config::Config;
use crate::context::Workspace;
use crate::error::{AloneError, Result};
use crate::fs::atomic_write_file;
use std::fs;

pub fn cmd_init(ws: &Workspace) -> Result<()> {
    for dir in [&ws.locks_dir, &ws.talks_dir, &ws.events_dir, &ws.logs_dir] {
        fs::create_dir_all(dir).map_err(|e| {
            AloneError::UserError(format!(
                "failed to create directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }

    let config_path = ws.config_path();
    if config_path.exists() {
        // Refuse to report success on top of a broken config.
        Config::load(&config_path)?;
        println!("Workspace already initialized at {}", ws.state_dir.display());
        return Ok(());
    }

    atomic_write_file(&config_path, &Config::default().to_yaml()?)?;
    println!("Initialized alone workspace at {}", ws.state_dir.display());
    Ok(())
}
