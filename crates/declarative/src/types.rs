//! Core types for declarative resource management

use serde::{Deserialize, Serialize};

/// How a failure of a resource affects the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Failure aborts the run
    Fatal,
    /// Failure is logged and the run continues
    BestEffort,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Fatal
    }
}

/// Current or desired state of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists/is configured
    Present { details: Option<String> },
    /// Resource does not exist/is not configured
    Absent,
    /// Resource exists but differs from desired
    Modified { from: String, to: String },
    /// State cannot be determined
    Unknown,
}

impl ResourceState {
    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Short label for status tables
    pub fn label(&self) -> &'static str {
        match self {
            Self::Present { .. } => "present",
            Self::Absent => "absent",
            Self::Modified { .. } => "divergent",
            Self::Unknown => "unknown",
        }
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified (including unconditional overwrites)
    Modified,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    /// Resources that did not exist before
    pub created: usize,
    /// Resources changed or rewritten in place
    pub modified: usize,
    /// Resources skipped, including every resource of a dry run
    pub skipped: usize,
    /// Best-effort resources that failed
    pub failed: usize,
    /// Resources already converged
    pub no_change: usize,
    /// Per-resource outcome, in plan order
    pub outcomes: Vec<(String, ApplyResult)>,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.skipped + self.failed + self.no_change
    }

    /// Outcome recorded for a resource id
    pub fn outcome(&self, id: &str) -> Option<&ApplyResult> {
        self.outcomes
            .iter()
            .find(|(rid, _)| rid == id)
            .map(|(_, result)| result)
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, id: &str, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push((id.to_string(), result.clone()));
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Detect only, make no changes
    pub dry_run: bool,
}
