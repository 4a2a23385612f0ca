//! Alone: a per-resource mutual-exclusion gate for comment-triggered
//! automation.
//!
//! At most one unit of work is in flight per repository. Each trigger passes
//! through a [`gate::Gate`], which consults the work item's persisted state,
//! heals locks left behind by crashed runs, takes the repository lock, and
//! either runs the [`delegate::Delegate`] or defers the trigger with
//! [`outcome::Outcome::Later`].
//!
//! ```no_run
//! use alone::gate::Gate;
//! use alone::lock::FileLockService;
//! use alone::state::FileStateSource;
//! use alone::delegate::CommandDelegate;
//! use alone::trigger::CommentTrigger;
//! use std::time::Duration;
//!
//! let gate = Gate::new(
//!     FileLockService::new(".alone/locks"),
//!     FileStateSource::new(".alone/talks"),
//!     CommandDelegate::new("./build.sh {repo}", ".", ".alone/logs", Duration::from_secs(600)),
//! );
//! let trigger = CommentTrigger {
//!     repo: "acme/widgets".parse()?,
//!     talk: "acme-widgets-42".to_string(),
//!     body: "@bot deploy".to_string(),
//!     author: "octocat".to_string(),
//! };
//! let outcome = gate.process(&trigger)?;
//! # Ok::<(), alone::error::AloneError>(())
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod delegate;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod gate;
pub mod key;
pub mod lock;
pub mod outcome;
pub mod state;
pub mod trigger;
