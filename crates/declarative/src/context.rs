//! Apply context and progress reporting
//!
//! Resources never spawn processes themselves; they receive a [`Runner`]
//! through the context so privilege drop and logging stay uniform.

use crate::types::{ApplyResult, Severity};
use cmdkit::Runner;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called once before the first resource
    fn on_plan_start(&mut self, total: usize);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, index: usize, total: usize, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when a resource returned an error
    fn on_resource_error(&mut self, id: &str, severity: Severity, error: &anyhow::Error);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan_start(&mut self, _total: usize) {}
    fn on_resource_start(&mut self, _index: usize, _total: usize, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_resource_error(&mut self, _id: &str, _severity: Severity, _error: &anyhow::Error) {}
}

/// Context passed to resource apply operations
pub struct ApplyContext<'a> {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Command runner for every external effect
    pub runner: &'a dyn Runner,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(dry_run: bool, runner: &'a dyn Runner) -> Self {
        Self { dry_run, runner }
    }

    /// Skipped result used by every resource in dry-run mode
    pub fn dry_run_result() -> ApplyResult {
        ApplyResult::Skipped {
            reason: "Dry run".to_string(),
        }
    }
}
