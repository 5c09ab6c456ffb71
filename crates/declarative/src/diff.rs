//! Diff computation for resources

use crate::resource::{Resource, ResourceExt};
use crate::types::ResourceState;
use anyhow::Result;
use cmdkit::Runner;
use serde::{Deserialize, Serialize};

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
    /// Whether a failure aborts the run
    pub fatal: bool,
}

impl ResourceDiff {
    /// Detect state of a resource, whether or not it differs
    pub fn inspect(resource: &dyn Resource, runner: &dyn Runner) -> Result<Self> {
        Ok(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current: resource.current_state(runner)?,
            desired: resource.desired_state(),
            fatal: resource.is_fatal(),
        })
    }

    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource, runner: &dyn Runner) -> Result<Option<Self>> {
        let diff = Self::inspect(resource, runner)?;
        if diff.is_converged() {
            return Ok(None);
        }
        Ok(Some(diff))
    }

    /// Whether current already matches desired
    pub fn is_converged(&self) -> bool {
        self.current == self.desired
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources that have differences between current and desired state.
/// Resources whose state cannot be detected are reported as `Unknown`.
pub fn compute_diffs(resources: &[Box<dyn Resource>], runner: &dyn Runner) -> Vec<ResourceDiff> {
    resources
        .iter()
        .filter_map(|r| match ResourceDiff::from_resource(r.as_ref(), runner) {
            Ok(diff) => diff,
            Err(e) => {
                log::debug!("state detection failed for {}: {e:#}", r.id());
                Some(ResourceDiff {
                    resource_id: r.id(),
                    resource_type: r.resource_type().to_string(),
                    description: r.description(),
                    current: ResourceState::Unknown,
                    desired: r.desired_state(),
                    fatal: r.is_fatal(),
                })
            }
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to change or overwrite
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
