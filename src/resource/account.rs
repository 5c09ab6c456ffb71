//! Service account that owns the checkout and runs the service.

use anyhow::{Context, Result};
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub name: String,
    pub home: PathBuf,
}

impl ServiceAccount {
    pub fn new(name: &str, home: impl AsRef<Path>) -> Self {
        Self {
            name: name.to_string(),
            home: home.as_ref().to_path_buf(),
        }
    }

    fn exists(&self, runner: &dyn Runner) -> bool {
        runner.probe(
            &CommandLine::argv(["id", "-u", self.name.as_str()]),
            &RunOptions::new(),
        )
    }

    fn ensure_home(&self) -> Result<()> {
        fs::create_dir_all(&self.home)
            .with_context(|| format!("Failed to create {}", self.home.display()))
    }
}

impl Resource for ServiceAccount {
    fn id(&self) -> String {
        format!("account:{}", self.name)
    }

    fn description(&self) -> String {
        format!("Service account {} ({})", self.name, self.home.display())
    }

    fn resource_type(&self) -> &'static str {
        "account"
    }

    fn current_state(&self, runner: &dyn Runner) -> Result<ResourceState> {
        if self.exists(runner) {
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

        let result = if self.exists(ctx.runner) {
            log::info!("user {} exists", self.name);
            ApplyResult::NoChange
        } else {
            let home = self.home.display().to_string();
            ctx.runner.run(
                &CommandLine::argv([
                    "adduser",
                    "--system",
                    "--group",
                    "--disabled-password",
                    "--gecos",
                    "",
                    "--home",
                    home.as_str(),
                    self.name.as_str(),
                ]),
                &RunOptions::new(),
            )?;
            ApplyResult::Created
        };

        self.ensure_home()?;
        Ok(result)
    }
}
