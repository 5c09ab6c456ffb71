//! Runner trait and the real process-spawning implementation.

use crate::command::CommandLine;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Per-invocation options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Treat a non-zero exit as [`Error::CommandFailed`]
    pub check: bool,
    /// Account to impersonate (only honored when running as root)
    pub run_as: Option<String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Capture stdout/stderr instead of streaming them
    pub capture: bool,
    /// Values masked as `***` in logs and errors
    pub redact: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            check: true,
            run_as: None,
            cwd: None,
            env: Vec::new(),
            capture: false,
            redact: Vec::new(),
        }
    }
}

impl RunOptions {
    /// Checked, streamed, as the current identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report failure as a status instead of an error.
    pub fn unchecked(mut self) -> Self {
        self.check = false;
        self
    }

    /// Run as another account.
    pub fn as_user(mut self, user: impl Into<String>) -> Self {
        self.run_as = Some(user.into());
        self
    }

    /// Change directory before running.
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Capture standard streams.
    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Mask a sensitive value in the logged command line.
    pub fn redacting(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.redact.push(secret);
        }
        self
    }

    /// Apply the redaction list to a string.
    pub fn mask(&self, text: &str) -> String {
        self.redact
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), "***"))
    }
}

/// Output of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Captured stdout (empty when streamed)
    pub stdout: Vec<u8>,
    /// Captured stderr (empty when streamed)
    pub stderr: Vec<u8>,
    /// Whether the command exited successfully
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Executes commands on behalf of reconciliation steps.
///
/// This is the single trust boundary of a provisioning run: privilege drop
/// and logging happen here and nowhere else.
pub trait Runner {
    /// Run a command.
    fn run(&self, cmd: &CommandLine, opts: &RunOptions) -> Result<CommandOutput>;

    /// Run a command and return its trimmed stdout.
    fn capture(&self, cmd: &CommandLine, opts: &RunOptions) -> Result<String> {
        let opts = opts.clone().captured();
        let output = self.run(cmd, &opts)?;
        Ok(output.stdout_str().trim().to_string())
    }

    /// Run a read-only check, returning whether it succeeded.
    ///
    /// Spawn failures count as "no".
    fn probe(&self, cmd: &CommandLine, opts: &RunOptions) -> bool {
        let opts = opts.clone().unchecked().captured();
        self.run(cmd, &opts).map(|o| o.success).unwrap_or(false)
    }
}

/// Whether the effective uid is root.
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// A fully resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    /// Argument vector to spawn
    pub argv: Vec<String>,
    /// Working directory for the child
    pub cwd: Option<PathBuf>,
    /// Environment for the child
    pub env: Vec<(String, String)>,
    /// The line written to the log
    pub log_line: String,
}

/// Runner that spawns real processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    root: bool,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRunner {
    /// Create a runner for the current process identity.
    pub fn new() -> Self {
        Self { root: is_root() }
    }

    /// Create a runner with an explicit identity (for tests).
    pub fn with_identity(root: bool) -> Self {
        Self { root }
    }

    /// Whether this runner executes as root.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Resolve a command and options into what will be spawned.
    ///
    /// When impersonating, the working directory and environment are folded
    /// into the `bash -lc` script because sudo resets both.
    pub fn prepare(&self, cmd: &CommandLine, opts: &RunOptions) -> Result<Prepared> {
        if let Some(user) = opts.run_as.as_deref().filter(|_| self.root) {
            let mut parts = Vec::new();
            if let Some(dir) = &opts.cwd {
                parts.push(format!("cd {}", shell_words::quote(&dir.to_string_lossy())));
            }
            for (key, value) in &opts.env {
                parts.push(format!("export {key}={}", shell_words::quote(value)));
            }
            parts.push(cmd.to_shell_string()?);

            let argv: Vec<String> = ["sudo", "-H", "-u", user, "bash", "-lc"]
                .iter()
                .map(|s| (*s).to_string())
                .chain(std::iter::once(parts.join(" && ")))
                .collect();
            let log_line = format!("$ {}", shell_words::join(&argv));

            return Ok(Prepared {
                argv,
                cwd: None,
                env: Vec::new(),
                log_line: opts.mask(&log_line),
            });
        }

        let argv = cmd.to_argv()?;
        let log_line = match &opts.cwd {
            Some(dir) => format!("(cd {})$ {cmd}", dir.display()),
            None => format!("$ {cmd}"),
        };

        Ok(Prepared {
            argv,
            cwd: opts.cwd.clone(),
            env: opts.env.clone(),
            log_line: opts.mask(&log_line),
        })
    }
}

impl Runner for SystemRunner {
    fn run(&self, cmd: &CommandLine, opts: &RunOptions) -> Result<CommandOutput> {
        let prepared = self.prepare(cmd, opts)?;
        log::info!("{}", prepared.log_line);

        let display = opts.mask(&cmd.to_string());
        let (program, args) = prepared.argv.split_first().ok_or(Error::Empty)?;

        let mut command = Command::new(program);
        command.args(args).envs(prepared.env.iter().cloned());
        if let Some(dir) = &prepared.cwd {
            command.current_dir(dir);
        }

        let output = if opts.capture {
            command.output().map(CommandOutput::from)
        } else {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map(|status| CommandOutput {
                    code: status.code(),
                    success: status.success(),
                    ..Default::default()
                })
        }
        .map_err(|source| Error::Spawn {
            command: display.clone(),
            source,
        })?;

        if opts.check && !output.success {
            return Err(Error::CommandFailed {
                command: display,
                code: output.code,
                stderr: output.stderr_str().trim().to_string(),
            });
        }

        log::debug!("exit {:?}: {}", output.code, display);
        Ok(output)
    }
}
