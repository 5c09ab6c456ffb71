use anyhow::Result;
use cmdkit::SystemRunner;

use crate::cli::OptionArgs;
use crate::orchestrator::resolve_domain;
use crate::render::render;

/// Print the document that `apply` would write.
pub fn run(args: OptionArgs) -> Result<()> {
    let options = super::load_options(&args)?;
    let options = resolve_domain(options, &SystemRunner::new());

    print!("{}", render(&options)?.to_yaml()?);
    Ok(())
}
