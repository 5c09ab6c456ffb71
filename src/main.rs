mod cli;
mod commands;
mod document;
mod error;
mod layout;
mod options;
mod orchestrator;
mod progress;
mod render;
mod resource;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Provisioning narrates every command at info level
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context { quiet: cli.quiet };

    let result = match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Status(args) => commands::status::run(&ctx, args),
        Command::Render(args) => commands::render::run(args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "tubestrap", &mut io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));

    let failed = err.chain().find_map(|e| e.downcast_ref::<cmdkit::Error>());
    if let Some(cmdkit::Error::CommandFailed { stderr, .. }) = failed {
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            ui::dim(line);
        }
    }
}
