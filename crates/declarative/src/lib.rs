//! # Declarative
//!
//! A framework for declarative, ordered resource reconciliation.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging a host to match it, one resource
//! at a time.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (accounts, files, databases)
//! - **ResourceState**: The current or desired state of a resource
//! - **Severity**: Whether a failure aborts the run or is logged and skipped
//! - **ExecutionPlan**: Resources in dependency order
//! - **Executor**: Applies resources sequentially through a [`cmdkit::Runner`]
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecutionPlan, ExecuteOptions, execute_simple};
//! use cmdkit::SystemRunner;
//!
//! let mut plan = ExecutionPlan::new();
//! plan.push(Box::new(MyResource::new()));
//!
//! let summary = execute_simple(&plan, &ExecuteOptions::default(), &SystemRunner::new())?;
//! println!("{} changes", summary.total_changes());
//! ```

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState, Severity};
