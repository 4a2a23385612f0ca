//! Implementation of the `alone process` command.
//!
//! Wires the gate to the workspace: lock files under `locks/`, talk documents
//! under `talks/`, and the configured delegate command.

use super::load_workspace;
use crate::cli::ProcessArgs;
use crate::context::Workspace;
use crate::delegate::CommandDelegate;
use crate::error::Result;
use crate::events::{Event, EventAction, append_event};
use crate::exit_codes;
use crate::gate::{Gate, Trace};
use crate::lock::FileLockService;
use crate::outcome::Outcome;
use crate::state::FileStateSource;
use crate::trigger::CommentTrigger;
use serde_json::json;

pub fn cmd_process(ws: &Workspace, args: ProcessArgs) -> Result<i32> {
    let config = load_workspace(ws)?;
    let trigger = CommentTrigger {
        repo: args.repo.parse()?,
        talk: args.talk,
        body: args.comment,
        author: args.author,
    };

    let delegate = CommandDelegate::new(
        config.delegate_command.clone(),
        ws.root.clone(),
        ws.logs_dir.clone(),
        config.delegate_timeout(),
    );
    delegate.check()?;

    let gate = Gate::with_prefix(
        FileLockService::new(ws.locks_dir.clone()),
        FileStateSource::new(ws.talks_dir.clone()),
        delegate,
        config.key_prefix.clone(),
    );

    let mut trace = Trace::default();
    let result = gate.process_traced(&trigger, &mut trace);
    record_events(ws, &trigger, &trace, &result);

    match result? {
        Outcome::Proceed(payload) => {
            println!("proceed: {}", payload);
            Ok(exit_codes::SUCCESS)
        }
        Outcome::Empty => {
            println!("empty");
            Ok(exit_codes::SUCCESS)
        }
        Outcome::Later => {
            println!("later");
            Ok(exit_codes::DEFERRED)
        }
    }
}

/// Audit the lock calls made for one trigger, and the error if it failed.
/// Best-effort.
fn record_events(
    ws: &Workspace,
    trigger: &CommentTrigger,
    trace: &Trace,
    result: &Result<Outcome<String>>,
) {
    let mut actions = Vec::new();
    if trace.self_healed {
        actions.push(EventAction::SelfHeal);
    }
    if trace.acquired {
        actions.push(EventAction::Acquire);
    }
    if trace.deferred {
        actions.push(EventAction::Defer);
    }
    if trace.released {
        actions.push(EventAction::Release);
    }
    if result.is_err() {
        actions.push(EventAction::Fail);
    }

    let mut details = json!({
        "key": trace.key.as_ref().map(|k| k.as_str()),
        "holder": trace.holder,
        "author": trigger.author,
    });
    match result {
        Ok(outcome) => {
            details["outcome"] = json!(match outcome {
                Outcome::Proceed(_) => "proceed",
                Outcome::Empty => "empty",
                Outcome::Later => "later",
            });
        }
        Err(e) => details["error"] = json!(e.to_string()),
    }

    for action in actions {
        let event = Event::new(action)
            .with_resource(trigger.repo.to_string())
            .with_details(details.clone());
        if let Err(e) = append_event(ws, &event) {
            tracing::warn!(%action, error = %e, "failed to record event");
        }
    }
}
