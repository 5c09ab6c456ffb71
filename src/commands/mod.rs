pub mod apply;
pub mod render;
pub mod status;

use anyhow::Result;

use crate::cli::OptionArgs;
use crate::options::Options;

/// Assemble options from the process environment, the env-file and overrides.
pub fn load_options(args: &OptionArgs) -> Result<Options> {
    Options::load(
        |key| std::env::var(key).ok(),
        Some(args.env_file.as_path()),
        &args.overrides,
    )
}
