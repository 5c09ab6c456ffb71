//! Execution engine - applies resources one after another
//!
//! Resources run strictly in plan order. A fatal resource that errors (or
//! reports `Failed`) stops the run and its error is returned unchanged. A
//! best-effort resource that errors is recorded as `Failed` and the run
//! continues.

use crate::context::{ApplyContext, NoProgress, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, Severity};
use anyhow::Result;
use cmdkit::Runner;

/// Execute a plan with the given options and progress callback
///
/// # Returns
/// Summary of execution results, or the first fatal error
pub fn execute<P: ProgressCallback>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    runner: &dyn Runner,
    progress: &mut P,
) -> Result<ExecuteSummary> {
    let total = plan.len();
    let mut summary = ExecuteSummary::default();
    progress.on_plan_start(total);

    for (index, resource) in plan.steps.iter().enumerate() {
        let id = resource.id();
        let severity = resource.severity();
        progress.on_resource_start(index + 1, total, &id, &resource.description());

        let mut ctx = ApplyContext::new(opts.dry_run, runner);
        match resource.apply(&mut ctx) {
            Ok(ApplyResult::Failed { error }) if severity == Severity::Fatal => {
                let err = anyhow::anyhow!("{id}: {error}");
                progress.on_resource_error(&id, severity, &err);
                return Err(err);
            }
            Ok(result) => {
                if let ApplyResult::Failed { error } = &result {
                    log::warn!("{id} failed (continuing): {error}");
                }
                progress.on_resource_complete(&id, &result);
                summary.add_result(&id, &result);
            }
            Err(e) => {
                progress.on_resource_error(&id, severity, &e);
                match severity {
                    Severity::Fatal => return Err(e),
                    Severity::BestEffort => {
                        log::warn!("{id} failed (continuing): {e:#}");
                        summary.add_result(
                            &id,
                            &ApplyResult::Failed {
                                error: format!("{e:#}"),
                            },
                        );
                    }
                }
            }
        }
    }

    Ok(summary)
}

/// Simple execution without callbacks
pub fn execute_simple(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    runner: &dyn Runner,
) -> Result<ExecuteSummary> {
    execute(plan, opts, runner, &mut NoProgress)
}
