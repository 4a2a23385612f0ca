//! CLI argument parsing for alone.
//!
//! Uses clap derive macros for declarative argument definitions.
//! Implementations live in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Alone: let at most one automation run per repository at a time.
///
/// Each trigger (a comment asking for work on a repository) passes through a
/// lock keyed by the repository. Busy repositories defer the trigger; the
/// caller re-drives it later.
#[derive(Parser, Debug)]
#[command(name = "alone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workspace root (default: current directory).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the `.alone/` workspace layout and default config.
    Init,

    /// Print the lock key derived for a repository.
    Key(KeyArgs),

    /// Pass one trigger through the gate.
    ///
    /// Prints `proceed: <payload>`, `empty` or `later`. A deferred trigger
    /// exits with code 5 so a scheduler can retry it.
    Process(ProcessArgs),

    /// Lock management commands.
    Lock(LockCommand),
}

#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Repository coordinates (owner/name).
    pub repo: String,
}

#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Repository coordinates (owner/name).
    #[arg(long)]
    pub repo: String,

    /// Talk (work item) the trigger belongs to.
    #[arg(long)]
    pub talk: String,

    /// Comment body.
    #[arg(long, default_value = "")]
    pub comment: String,

    /// Comment author.
    #[arg(long, default_value = "")]
    pub author: String,
}

#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List held locks with their holder and age.
    List,

    /// Remove a lock regardless of its holder.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Lock key as shown by `alone lock list`.
    pub key: String,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
