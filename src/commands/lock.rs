//! Implementation of the `alone lock` commands.

use super::load_workspace;
use crate::cli::LockClearArgs;
use crate::context::Workspace;
use crate::error::{AloneError, Result};
use crate::events::{Event, EventAction, append_event};
use crate::key::LockKey;
use crate::lock::FileLockService;
use serde_json::json;

pub fn cmd_lock_list(ws: &Workspace) -> Result<()> {
    let config = load_workspace(ws)?;
    let locks = FileLockService::new(ws.locks_dir.clone()).list(config.lock_stale_minutes)?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();

    for lock in &locks {
        println!("  {}:", lock.key);
        match &lock.metadata {
            Some(metadata) => {
                println!("    Holder:     {}", metadata.holder);
                println!("    Owner:      {}", metadata.owner);
                if let Some(pid) = metadata.pid {
                    println!("    PID:        {}", pid);
                }
                println!(
                    "    Created:    {}",
                    metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
                println!("    Age:        {}", metadata.age_string());
            }
            None => {
                println!("    Holder:     unknown");
                println!("    Status:     CORRUPT (unreadable lock metadata)");
            }
        }
        if lock.is_stale {
            println!(
                "    Status:     STALE (exceeds {} min threshold)",
                config.lock_stale_minutes
            );
        }
        println!("    Path:       {}", lock.path.display());
        println!();
    }

    let stale_count = locks.iter().filter(|l| l.is_stale).count();
    if stale_count > 0 {
        println!(
            "{} stale lock(s). A stale lock clears itself on the next trigger once its talk \
             shows no request or daemon; otherwise use `alone lock clear <key> --force`.",
            stale_count
        );
    }
    let corrupt_count = locks.iter().filter(|l| l.is_corrupt()).count();
    if corrupt_count > 0 {
        println!(
            "{} corrupt lock(s). Remove with `alone lock clear <key> --force`.",
            corrupt_count
        );
    }

    Ok(())
}

pub fn cmd_lock_clear(ws: &Workspace, args: LockClearArgs) -> Result<()> {
    if !args.force {
        return Err(AloneError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock lets another talk run on the same repository while the\n\
             holder may still be working. Only clear it if the holder has crashed.\n\n\
             To clear the lock, run:\n  alone lock clear {} --force",
            args.key
        )));
    }

    let config = load_workspace(ws)?;
    let key = LockKey::from_normalized(args.key.as_str()).ok_or_else(|| {
        AloneError::UserError(format!(
            "'{}' is not a lock key\n\
             Fix: copy the key from `alone lock list` or `alone key <owner/name>`.",
            args.key
        ))
    })?;

    let cleared = FileLockService::new(ws.locks_dir.clone()).clear(&key, config.lock_stale_minutes)?;

    let details = match &cleared.metadata {
        Some(metadata) => json!({
            "key": cleared.key.as_str(),
            "holder": metadata.holder,
            "owner": metadata.owner,
            "age_minutes": metadata.age().num_minutes(),
            "was_stale": cleared.is_stale,
        }),
        None => json!({
            "key": cleared.key.as_str(),
            "holder": "unknown",
            "corrupt": true,
        }),
    };
    let event = Event::new(EventAction::LockClear).with_details(details);
    if let Err(e) = append_event(ws, &event) {
        tracing::warn!(error = %e, "failed to record lock_clear event");
    }

    println!("Cleared lock: {}", cleared);
    Ok(())
}
