//! Delegate that runs an external command.
//!
//! The command template is split into arguments with shell-words *before*
//! substitution, so comment text always lands in a single argument and is
//! never re-parsed by a shell. Available variables: `{repo}`, `{talk}`,
//! `{comment}`, `{author}`.
//!
//! Exit 0 with non-blank stdout is `Proceed(stdout)`, exit 0 with blank stdout
//! is `Empty`. A non-zero exit, a signal or a timeout is a delegate failure.

use super::Delegate;
use super::template::{TemplateError, render_template};
use crate::error::{AloneError, Result};
use crate::outcome::Decision;
use crate::trigger::CommentTrigger;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const VARIABLES: [&str; 4] = ["author", "comment", "repo", "talk"];

#[derive(Debug, Clone)]
pub struct CommandDelegate {
    template: String,
    working_dir: PathBuf,
    logs_dir: PathBuf,
    timeout: Duration,
}

impl CommandDelegate {
    pub fn new(
        template: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        logs_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            template: template.into(),
            working_dir: working_dir.into(),
            logs_dir: logs_dir.into(),
            timeout,
        }
    }

    /// Check that the command template is usable, before any lock is taken.
    pub fn check(&self) -> Result<()> {
        let placeholders: HashMap<String, String> = VARIABLES
            .iter()
            .map(|name| (name.to_string(), String::new()))
            .collect();
        self.render(&placeholders).map(|_| ())
    }

    fn render_args(&self, trigger: &CommentTrigger) -> Result<Vec<String>> {
        let variables: HashMap<String, String> = [
            ("repo", trigger.repo.to_string()),
            ("talk", trigger.talk.clone()),
            ("comment", trigger.body.clone()),
            ("author", trigger.author.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        self.render(&variables)
    }

    fn render(&self, variables: &HashMap<String, String>) -> Result<Vec<String>> {
        if self.template.trim().is_empty() {
            return Err(AloneError::UserError(
                "no delegate command configured\n\
                 Fix: set 'delegate_command' in .alone/config.yaml."
                    .to_string(),
            ));
        }

        let parts = shell_words::split(&self.template).map_err(|e| {
            AloneError::UserError(format!(
                "failed to parse delegate command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.template, e
            ))
        })?;
        if parts.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(AloneError::UserError(format!(
                "delegate command is empty after parsing: '{}'",
                self.template
            )));
        }

        parts
            .iter()
            .map(|part| render_template(part, variables))
            .collect::<std::result::Result<Vec<_>, TemplateError>>()
            .map_err(|e| {
                AloneError::UserError(format!(
                    "delegate command template is invalid: {}\n\
                     Command: {}\n\
                     Available variables: {}",
                    e,
                    self.template,
                    VARIABLES.join(", ")
                ))
            })
    }
}

impl Delegate<CommentTrigger> for CommandDelegate {
    type Payload = String;

    fn invoke(&self, trigger: &CommentTrigger) -> Result<Decision<String>> {
        let args = self.render_args(trigger)?;
        let Some((program, rest)) = args.split_first() else {
            return Err(AloneError::UserError(format!(
                "delegate command is empty after parsing: '{}'",
                self.template
            )));
        };

        let logs_dir = self.logs_dir.join(&trigger.talk);
        fs::create_dir_all(&logs_dir).map_err(|e| {
            AloneError::Delegate(format!(
                "failed to create delegate logs directory '{}': {}",
                logs_dir.display(),
                e
            ))
        })?;
        let stdout_path = logs_dir.join("stdout.log");
        let stderr_path = logs_dir.join("stderr.log");

        let mut child = Command::new(program)
            .args(rest)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(create_log(&stdout_path)?))
            .stderr(Stdio::from(create_log(&stderr_path)?))
            .spawn()
            .map_err(|e| {
                AloneError::Delegate(format!(
                    "failed to execute delegate command '{}': {}\n\
                     Fix: ensure the command is installed and in PATH.",
                    program, e
                ))
            })?;

        let started = Instant::now();
        let (exit_code, timed_out) = wait_with_timeout(&mut child, self.timeout)?;
        tracing::debug!(
            program = %program,
            talk = %trigger.talk,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "delegate command finished"
        );

        if timed_out {
            return Err(AloneError::Delegate(format!(
                "'{}' timed out after {}s (stderr: {})",
                program,
                self.timeout.as_secs(),
                stderr_path.display()
            )));
        }

        match exit_code {
            None => Err(AloneError::Delegate(format!(
                "'{}' was terminated by a signal (stderr: {})",
                program,
                stderr_path.display()
            ))),
            Some(0) => {
                let stdout = fs::read_to_string(&stdout_path).map_err(|e| {
                    AloneError::Delegate(format!(
                        "failed to read delegate output '{}': {}",
                        stdout_path.display(),
                        e
                    ))
                })?;
                let payload = stdout.trim();
                if payload.is_empty() {
                    Ok(Decision::Empty)
                } else {
                    Ok(Decision::Proceed(payload.to_string()))
                }
            }
            Some(code) => Err(AloneError::Delegate(format!(
                "'{}' exited with status {} (stderr: {})",
                program,
                code,
                stderr_path.display()
            ))),
        }
    }
}

fn create_log(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| {
        AloneError::Delegate(format!(
            "failed to create delegate log '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Wait for a child process, killing it once `timeout` elapses.
///
/// Returns the exit code (`None` when terminated by a signal) and whether
/// the timeout fired.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(50);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status.code(), false)),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok((None, true));
                }
                std::thread::sleep(poll_interval);
            }
            Err(e) => {
                return Err(AloneError::Delegate(format!(
                    "failed to check delegate process status: {}",
                    e
                )));
            }
        }
    }
}
