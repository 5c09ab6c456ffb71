//! Error types for command execution.

use thiserror::Error;

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum Error {
    /// The command ran and exited unsuccessfully
    #[error("command failed ({}): {command}", exit_label(*.code))]
    CommandFailed {
        /// The command line as it was logged
        command: String,
        /// Exit code, `None` when the process was killed by a signal
        code: Option<i32>,
        /// Captured standard error (empty when output was streamed)
        stderr: String,
    },

    /// The process could not be started at all
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        /// The command line as it was logged
        command: String,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// A command line could not be split into words
    #[error("cannot tokenize `{command}`: {source}")]
    Tokenize {
        /// The offending command line
        command: String,
        /// Parse error from the word splitter
        source: shell_words::ParseError,
    },

    /// The command line had no program to run
    #[error("empty command line")]
    Empty,
}

impl Error {
    /// Exit code of a failed command, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether the command ran and returned a failure status.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = Error::CommandFailed {
            command: "nginx -t".to_string(),
            code: Some(1),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "command failed (exit code 1): nginx -t");
        assert_eq!(err.exit_code(), Some(1));
        assert!(err.is_command_failure());
    }

    #[test]
    fn test_signal_display() {
        let err = Error::CommandFailed {
            command: "yarn install".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_empty_is_not_command_failure() {
        assert!(!Error::Empty.is_command_failure());
    }
}
