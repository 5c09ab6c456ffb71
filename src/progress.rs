//! Terminal progress for a provisioning run.

use declarative::{ApplyResult, ProgressCallback, Severity};

use crate::ui;

/// Prints one line per step start and one per outcome.
#[derive(Debug, Default)]
pub struct StepProgress {
    pub quiet: bool,
}

impl StepProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ProgressCallback for StepProgress {
    fn on_plan_start(&mut self, total: usize) {
        if !self.quiet {
            ui::info(&format!("{total} steps"));
        }
    }

    fn on_resource_start(&mut self, index: usize, total: usize, _id: &str, description: &str) {
        if !self.quiet {
            ui::step(index, total, description);
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let line = format!("{id}: {}", ui::result_label(result));
        match result {
            ApplyResult::Failed { .. } => ui::warn(&line),
            _ if self.quiet => {}
            ApplyResult::Skipped { .. } | ApplyResult::NoChange => ui::dim(&line),
            _ => ui::success(&line),
        }
    }

    fn on_resource_error(&mut self, id: &str, severity: Severity, error: &anyhow::Error) {
        match severity {
            Severity::Fatal => ui::error(&format!("{id}: {error:#}")),
            Severity::BestEffort => ui::warn(&format!("{id}: {error:#} (continuing)")),
        }
    }
}
