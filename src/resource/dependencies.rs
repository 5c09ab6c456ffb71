//! Production dependencies of the checkout.

use anyhow::Result;
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::path::{Path, PathBuf};

/// `yarn install` in the checkout. Always re-run; yarn is a no-op when the
/// lockfile is already satisfied.
#[derive(Debug, Clone)]
pub struct Dependencies {
    pub dir: PathBuf,
    pub owner: String,
}

impl Dependencies {
    pub fn new(dir: impl AsRef<Path>, owner: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            owner: owner.to_string(),
        }
    }
}

impl Resource for Dependencies {
    fn id(&self) -> String {
        format!("dependencies:{}", self.dir.display())
    }

    fn description(&self) -> String {
        "Install production dependencies with yarn".to_string()
    }

    fn resource_type(&self) -> &'static str {
        "dependencies"
    }

    fn current_state(&self, _runner: &dyn Runner) -> Result<ResourceState> {
        if self.dir.join("node_modules").is_dir() {
            Ok(ResourceState::Present { details: None })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present { details: None }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyContext::dry_run_result());
        }

        ctx.runner.run(
            &CommandLine::argv(["yarn", "install", "--production", "--pure-lockfile"]),
            &RunOptions::new().as_user(&self.owner).in_dir(&self.dir),
        )?;
        Ok(ApplyResult::Modified)
    }
}
