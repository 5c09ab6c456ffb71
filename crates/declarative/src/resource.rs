//! Resource trait for declarative state management
//!
//! A Resource represents something on the host that can be in a certain
//! state, and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState, Severity};
use anyhow::Result;
use cmdkit::Runner;
use std::fmt;

/// Core trait for declarative resources
///
/// Every reconciliation step implements this trait, which provides:
/// - Identity (id, description, type)
/// - State detection (current vs desired)
/// - State convergence (apply)
/// - Failure policy (severity)
///
/// # Example
///
/// ```ignore
/// use declarative::{Resource, ResourceState, ApplyResult, ApplyContext};
/// use cmdkit::{CommandLine, RunOptions, Runner};
///
/// #[derive(Debug)]
/// struct Account {
///     name: String,
/// }
///
/// impl Resource for Account {
///     fn id(&self) -> String {
///         self.name.clone()
///     }
///
///     fn description(&self) -> String {
///         format!("Service account {}", self.name)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "account"
///     }
///
///     fn current_state(&self, runner: &dyn Runner) -> anyhow::Result<ResourceState> {
///         let cmd = CommandLine::argv(["id", "-u", self.name.as_str()]);
///         if runner.probe(&cmd, &RunOptions::new()) {
///             Ok(ResourceState::Present { details: None })
///         } else {
///             Ok(ResourceState::Absent)
///         }
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::Present { details: None }
///     }
///
///     fn apply(&self, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
///         if ctx.dry_run {
///             return Ok(ApplyContext::dry_run_result());
///         }
///         if self.current_state(ctx.runner)?.is_present() {
///             return Ok(ApplyResult::NoChange);
///         }
///         ctx.runner.run(&CommandLine::argv(["adduser", self.name.as_str()]), &RunOptions::new())?;
///         Ok(ApplyResult::Created)
///     }
/// }
/// ```
pub trait Resource: fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// Stable across runs, e.g. "database_role:peertube".
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for filtering
    fn resource_type(&self) -> &'static str;

    /// What a failure of this resource means for the run
    fn severity(&self) -> Severity {
        Severity::Fatal
    }

    /// Detect the current state of this resource
    ///
    /// Must not mutate the host.
    fn current_state(&self, runner: &dyn Runner) -> Result<ResourceState>;

    /// Get the desired state for this resource
    fn desired_state(&self) -> ResourceState;

    /// Apply changes to reach the desired state
    ///
    /// This method should:
    /// 1. Respect ctx.dry_run (return Skipped if true)
    /// 2. Re-detect and return NoChange when already converged
    /// 3. Make the necessary changes through `ctx.runner`
    /// 4. Return the appropriate ApplyResult
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with boxed resources
pub trait ResourceExt {
    /// Check if a failure of this resource aborts the run
    fn is_fatal(&self) -> bool;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
