//! Command line representation.

use crate::error::{Error, Result};
use std::fmt;

/// A command to execute.
///
/// Only [`CommandLine::Shell`] is ever handed to a shell. A
/// [`CommandLine::Line`] is split into words with POSIX quoting rules and
/// executed directly, so operator characters coming from configuration values
/// are never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Program and arguments, passed verbatim
    Argv(Vec<String>),
    /// A single line, tokenized before execution
    Line(String),
    /// A line evaluated by `bash -c` (pipes, redirections, inline env)
    Shell(String),
}

impl CommandLine {
    /// Build from a program and its arguments.
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Argv(args.into_iter().map(Into::into).collect())
    }

    /// Build from a line that will be tokenized.
    pub fn line(line: impl Into<String>) -> Self {
        Self::Line(line.into())
    }

    /// Build from a line that must be evaluated by a shell.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::Shell(script.into())
    }

    /// Whether this command is evaluated by a shell.
    pub fn is_shell(&self) -> bool {
        matches!(self, Self::Shell(_))
    }

    /// Resolve to the argument vector that will actually be spawned.
    pub fn to_argv(&self) -> Result<Vec<String>> {
        let argv = match self {
            Self::Argv(args) => args.clone(),
            Self::Line(line) => shell_words::split(line).map_err(|source| Error::Tokenize {
                command: line.clone(),
                source,
            })?,
            Self::Shell(script) => vec!["bash".to_string(), "-c".to_string(), script.clone()],
        };

        if argv.is_empty() {
            return Err(Error::Empty);
        }
        Ok(argv)
    }

    /// Render as a string suitable for `bash -c`.
    ///
    /// Argument vectors and tokenized lines are re-quoted word by word so that
    /// the shell sees exactly the same words; shell scripts pass through.
    pub fn to_shell_string(&self) -> Result<String> {
        match self {
            Self::Shell(script) => Ok(script.clone()),
            other => Ok(shell_words::join(other.to_argv()?)),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argv(args) => f.write_str(&shell_words::join(args)),
            Self::Line(line) | Self::Shell(line) => f.write_str(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_is_tokenized_with_quotes() {
        let cmd = CommandLine::line(r#"adduser --gecos "" --home '/var/www' peertube"#);
        let argv = cmd.to_argv().unwrap();
        assert_eq!(
            argv,
            vec!["adduser", "--gecos", "", "--home", "/var/www", "peertube"]
        );
    }

    #[test]
    fn test_line_operators_are_plain_words() {
        let cmd = CommandLine::line("echo a | rm -rf /tmp/x; true");
        let argv = cmd.to_argv().unwrap();
        assert_eq!(argv[0], "echo");
        assert!(argv.contains(&"|".to_string()));
        assert!(argv.contains(&"/tmp/x;".to_string()));
        assert!(!cmd.is_shell());
    }

    #[test]
    fn test_shell_goes_through_bash() {
        let cmd = CommandLine::shell("node -v | grep -q '^v20'");
        assert_eq!(
            cmd.to_argv().unwrap(),
            vec!["bash", "-c", "node -v | grep -q '^v20'"]
        );
    }

    #[test]
    fn test_unbalanced_quote_is_an_error() {
        let err = CommandLine::line("echo 'oops").to_argv().unwrap_err();
        assert!(matches!(err, Error::Tokenize { .. }));
    }

    #[test]
    fn test_empty_line() {
        assert!(matches!(
            CommandLine::line("   ").to_argv().unwrap_err(),
            Error::Empty
        ));
    }

    #[test]
    fn test_argv_display_quotes_words() {
        let cmd = CommandLine::argv(["psql", "-c", "SELECT 1"]);
        assert_eq!(cmd.to_string(), "psql -c 'SELECT 1'");
    }

    #[test]
    fn test_shell_string_requotes_words() {
        let cmd = CommandLine::line(r#"git commit -m "two words""#);
        assert_eq!(cmd.to_shell_string().unwrap(), "git commit -m 'two words'");
    }
}
