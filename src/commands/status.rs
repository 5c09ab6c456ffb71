use anyhow::Result;
use cmdkit::SystemRunner;
use declarative::{DiffSummary, compute_diffs};

use crate::Context;
use crate::cli::StatusArgs;
use crate::error::require_root;
use crate::layout::Layout;
use crate::orchestrator::{build_plan, resolve_domain};
use crate::ui;

pub fn run(ctx: &Context, args: StatusArgs) -> Result<()> {
    require_root()?;
    let runner = SystemRunner::new();
    let options = resolve_domain(super::load_options(&args.options)?, &runner);
    let layout = Layout::new(&options.home);

    let plan = build_plan(&options, &layout)?.filter_by_target(args.target.as_deref());
    if plan.is_empty() {
        ui::warn("No steps match the target");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!("PeerTube on {}", options.domain));
    }

    let diffs = compute_diffs(&plan.steps, &runner);
    for diff in &diffs {
        ui::state(&diff.resource_id, &diff.current);
    }

    let summary = DiffSummary::from_diffs(&diffs);
    println!();
    ui::dim(&format!(
        "{} of {} steps converged",
        plan.len() - diffs.len(),
        plan.len()
    ));
    if summary.has_changes() {
        ui::info(&format!(
            "{} to create, {} to update; run `tubestrap apply`",
            summary.additions, summary.modifications
        ));
    } else {
        ui::success("Host is converged");
    }
    Ok(())
}
