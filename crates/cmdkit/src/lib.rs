//! # cmdkit
//!
//! Privilege-aware command execution.
//!
//! Every external effect of a provisioning run goes through a [`Runner`]:
//!
//! - Commands are expressed as a [`CommandLine`]: an argument vector, a line
//!   tokenized with POSIX quoting rules, or an explicitly shell-evaluated string.
//! - [`RunOptions`] carry the call-site decisions: whether a non-zero exit is an
//!   error, which account to run as, the working directory, extra environment,
//!   and whether output is captured or streamed.
//! - Every invocation is logged before it runs, so a failed run can be
//!   reproduced by hand.
//!
//! ## Example
//!
//! ```no_run
//! use cmdkit::{CommandLine, RunOptions, Runner, SystemRunner};
//!
//! let runner = SystemRunner::new();
//!
//! // Tokenized, never passed to a shell
//! runner.run(&CommandLine::line("git fetch --all"), &RunOptions::new().as_user("peertube"))?;
//!
//! // Pipes must be marked explicitly
//! runner.run(
//!     &CommandLine::shell("curl -fsSL https://deb.nodesource.com/setup_20.x | bash -"),
//!     &RunOptions::new(),
//! )?;
//! # Ok::<(), cmdkit::Error>(())
//! ```
//!
//! For tests, [`testing::ScriptedRunner`] records invocations and answers from
//! a table of canned replies instead of spawning processes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod error;
pub mod runner;
pub mod testing;

pub use command::CommandLine;
pub use error::{Error, Result};
pub use runner::{CommandOutput, Prepared, RunOptions, Runner, SystemRunner, is_root};
