//! Implementation of the `alone key` command.

use crate::cli::KeyArgs;
use crate::config::Config;
use crate::context::Workspace;
use crate::error::Result;
use crate::key::{ResourceIdentity, derive_key};

/// Print the lock key for a repository.
///
/// Uses the workspace's `key_prefix` when a workspace exists, else the default.
pub fn cmd_key(ws: &Workspace, args: KeyArgs) -> Result<()> {
    println!("{}", key_for(ws, &args.repo)?);
    Ok(())
}

fn key_for(ws: &Workspace, repo: &str) -> Result<String> {
    let identity: ResourceIdentity = repo.parse()?;
    let config = if ws.is_initialized() {
        Config::load(ws.config_path())?
    } else {
        Config::default()
    };
    Ok(derive_key(&config.key_prefix, &identity).to_string())
}
