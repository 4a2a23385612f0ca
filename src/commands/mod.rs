//! Command implementations for alone.
//!
//! Routes CLI commands to their handlers. Handlers return the process exit
//! code on success so `process` can report a deferred trigger distinctly.

mod init;
mod key;
mod lock;
mod process;

use crate::cli::{Command, LockAction};
use crate::config::Config;
use crate::context::Workspace;
use crate::error::Result;
use crate::exit_codes;
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(root: Option<&Path>, command: Command) -> Result<i32> {
    let ws = Workspace::resolve(root)?;
    match command {
        Command::Init => init::cmd_init(&ws).map(|()| exit_codes::SUCCESS),
        Command::Key(args) => key::cmd_key(&ws, args).map(|()| exit_codes::SUCCESS),
        Command::Process(args) => process::cmd_process(&ws, args),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::List => lock::cmd_lock_list(&ws).map(|()| exit_codes::SUCCESS),
            LockAction::Clear(args) => lock::cmd_lock_clear(&ws, args).map(|()| exit_codes::SUCCESS),
        },
    }
}

/// Check the workspace is initialized and load its config.
fn load_workspace(ws: &Workspace) -> Result<Config> {
    ws.require_initialized()?;
    Config::load(ws.config_path())
}
