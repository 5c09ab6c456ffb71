use anyhow::Result;
use cmdkit::SystemRunner;
use declarative::ExecuteOptions;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::error::require_root;
use crate::layout::Layout;
use crate::orchestrator::{Report, provision};
use crate::progress::StepProgress;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    require_root()?;
    let options = super::load_options(&args.options)?;
    let layout = Layout::new(&options.home);

    if !ctx.quiet {
        ui::banner();
        ui::header(if args.dry_run {
            "Provisioning PeerTube (dry run)"
        } else {
            "Provisioning PeerTube"
        });
    }

    let exec = ExecuteOptions { dry_run: args.dry_run };
    let mut progress = StepProgress::new(ctx.quiet);
    let report = provision(options, &layout, &exec, &SystemRunner::new(), &mut progress)?;

    print_report(&report, args.dry_run);
    Ok(())
}

fn print_report(report: &Report, dry_run: bool) {
    let summary = &report.summary;

    ui::section("Summary");
    ui::kv("created", &summary.created.to_string());
    ui::kv("updated", &summary.modified.to_string());
    ui::kv("unchanged", &summary.no_change.to_string());
    ui::kv("skipped", &summary.skipped.to_string());
    ui::kv("failed", &summary.failed.to_string());

    if dry_run {
        ui::info("Dry run: nothing was changed");
        return;
    }

    if summary.failed > 0 {
        ui::warn(&format!(
            "{} best-effort step(s) failed; see the warnings above",
            summary.failed
        ));
    }

    ui::section("Done");
    ui::kv("URL", &report.url);
    ui::dim("systemctl status peertube");
    ui::dim("journalctl -feu peertube");
    ui::dim("Initial admin password: journalctl -u peertube | grep -A1 'User password'");
}
