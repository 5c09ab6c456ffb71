//! Scripted runner for tests.
//!
//! [`ScriptedRunner`] never spawns anything. It records each invocation and
//! answers with the reply of the most recently added rule whose pattern is a
//! substring of the command line, or a plain success when nothing matches.

use crate::command::CommandLine;
use crate::error::{Error, Result};
use crate::runner::{CommandOutput, RunOptions, Runner};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command line as displayed
    pub command: String,
    /// Account requested by the caller
    pub run_as: Option<String>,
    /// Working directory requested by the caller
    pub cwd: Option<PathBuf>,
    /// Whether the command was marked for shell evaluation
    pub shell: bool,
}

/// Canned answer for a matching command.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Exit code to report
    pub code: i32,
    /// Stdout to return
    pub stdout: String,
    /// Stderr to return
    pub stderr: String,
}

impl Reply {
    /// Exit 0 with no output.
    pub fn ok() -> Self {
        Self {
            code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Exit 0 printing `stdout`.
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::ok()
        }
    }

    /// Exit with a non-zero code.
    pub fn fail(code: i32) -> Self {
        Self {
            code,
            stderr: format!("scripted failure ({code})"),
            ..Self::ok()
        }
    }
}

/// Recording runner driven by substring rules.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Runner that answers every command with success.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule (builder style).
    pub fn on(self, pattern: impl Into<String>, reply: Reply) -> Self {
        self.set(pattern, reply);
        self
    }

    /// Add a rule; later rules take precedence over earlier ones.
    pub fn set(&self, pattern: impl Into<String>, reply: Reply) {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern.into(), reply));
    }

    /// Every recorded invocation, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every recorded command line, in order.
    pub fn commands(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.command).collect()
    }

    /// Number of recorded commands containing `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(pattern)).count()
    }

    /// Whether any recorded command contains `pattern`.
    pub fn ran(&self, pattern: &str) -> bool {
        self.count(pattern) > 0
    }

    /// Forget recorded invocations (rules are kept).
    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn reply_for(&self, command: &str) -> Reply {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(Reply::ok)
    }
}

impl Runner for ScriptedRunner {
    fn run(&self, cmd: &CommandLine, opts: &RunOptions) -> Result<CommandOutput> {
        let command = cmd.to_string();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Invocation {
                command: command.clone(),
                run_as: opts.run_as.clone(),
                cwd: opts.cwd.clone(),
                shell: cmd.is_shell(),
            });

        let reply = self.reply_for(&command);
        let success = reply.code == 0;

        if opts.check && !success {
            return Err(Error::CommandFailed {
                command: opts.mask(&command),
                code: Some(reply.code),
                stderr: reply.stderr,
            });
        }

        Ok(CommandOutput {
            code: Some(reply.code),
            stdout: reply.stdout.into_bytes(),
            stderr: reply.stderr.into_bytes(),
            success,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_success_and_recording() {
        let runner = ScriptedRunner::new();
        runner
            .run(
                &CommandLine::line("systemctl daemon-reload"),
                &RunOptions::new().as_user("root"),
            )
            .unwrap();

        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command, "systemctl daemon-reload");
        assert_eq!(calls[0].run_as.as_deref(), Some("root"));
        assert!(runner.ran("daemon-reload"));
    }

    #[test]
    fn test_later_rule_wins() {
        let runner = ScriptedRunner::new()
            .on("id -u", Reply::fail(1))
            .on("id -u peertube", Reply::stdout("998\n"));

        assert_eq!(
            runner
                .capture(&CommandLine::line("id -u peertube"), &RunOptions::new())
                .unwrap(),
            "998"
        );
        assert!(!runner.probe(&CommandLine::line("id -u other"), &RunOptions::new()));
    }

    #[test]
    fn test_checked_failure_is_error() {
        let runner = ScriptedRunner::new().on("nginx -t", Reply::fail(1));
        let err = runner
            .run(&CommandLine::line("nginx -t"), &RunOptions::new())
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));

        let out = runner
            .run(&CommandLine::line("nginx -t"), &RunOptions::new().unchecked())
            .unwrap();
        assert!(!out.success);
        assert_eq!(runner.count("nginx -t"), 2);
    }

    #[test]
    fn test_clear_keeps_rules() {
        let runner = ScriptedRunner::new().on("false", Reply::fail(1));
        runner.probe(&CommandLine::line("false"), &RunOptions::new());
        runner.clear();
        assert!(runner.commands().is_empty());
        assert!(!runner.probe(&CommandLine::line("false"), &RunOptions::new()));
    }
}
