use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tubestrap")]
#[command(version)]
#[command(about = "Provision a PeerTube instance on a Debian/Ubuntu host", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the host: packages, database, checkout, config, proxy, service
    Apply(ApplyArgs),

    /// Show the detected state of every step without changing anything
    Status(StatusArgs),

    /// Print the rendered production.yaml to stdout
    Render(OptionArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Where options come from.
#[derive(Args, Debug, Clone)]
pub struct OptionArgs {
    /// KEY=value file applied over the environment
    #[arg(long, default_value = "pt.env", env = "PT_ENV_FILE")]
    pub env_file: PathBuf,

    /// Option overrides: --domain=video.example.org, --db-pass=..., PT_HTTPS=1.
    /// Everything after the first override is read as an override.
    #[arg(
        value_name = "KEY=VALUE",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub overrides: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Detect only; every step reports "Dry run"
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Only show steps of this type ("checkout") or id ("database:peertube")
    #[arg(long)]
    pub target: Option<String>,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_collects_overrides() {
        let cli = Cli::parse_from([
            "tubestrap",
            "-v",
            "apply",
            "--dry-run",
            "--env-file",
            "/etc/pt.env",
            "--domain=video.example.org",
            "PT_HTTPS=1",
        ]);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(cli.verbose, 1);
        assert!(args.dry_run);
        assert_eq!(args.options.env_file, PathBuf::from("/etc/pt.env"));
        assert_eq!(
            args.options.overrides,
            vec!["--domain=video.example.org", "PT_HTTPS=1"]
        );
    }

    #[test]
    fn test_flag_after_override_does_not_reach_a_real_run() {
        let cli = Cli::parse_from([
            "tubestrap",
            "apply",
            "--domain=video.example.org",
            "--dry-run",
        ]);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert!(!args.dry_run);
        assert_eq!(
            args.options.overrides,
            vec!["--domain=video.example.org", "--dry-run"]
        );

        let err = Options::load(|_: &str| None, None, &args.options.overrides).unwrap_err();
        assert!(err.to_string().contains("PT_DRY_RUN"));
    }

    #[test]
    fn test_render_defaults_env_file() {
        let cli = Cli::parse_from(["tubestrap", "render"]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert!(args.overrides.is_empty());
    }
}
