//! Application source checkout.

use anyhow::{Result, bail};
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::path::{Path, PathBuf};

/// A git clone kept at a pinned branch or tag.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub remote: String,
    pub dir: PathBuf,
    pub owner: String,
    /// Branch or tag; `None` fast-forwards the current branch
    pub reference: Option<String>,
}

enum CheckoutState {
    Missing,
    NotARepository,
    Repository,
}

impl Checkout {
    pub fn new(remote: &str, dir: impl AsRef<Path>, owner: &str, reference: Option<&str>) -> Self {
        Self {
            remote: remote.to_string(),
            dir: dir.as_ref().to_path_buf(),
            owner: owner.to_string(),
            reference: reference.map(str::to_string),
        }
    }

    fn check_current(&self) -> CheckoutState {
        if !self.dir.exists() {
            CheckoutState::Missing
        } else if !self.dir.join(".git").exists() {
            CheckoutState::NotARepository
        } else {
            CheckoutState::Repository
        }
    }

    fn as_owner(&self) -> RunOptions {
        RunOptions::new().as_user(&self.owner).in_dir(&self.dir)
    }

    fn head(&self, runner: &dyn Runner) -> Result<String> {
        Ok(runner.capture(
            &CommandLine::argv(["git", "rev-parse", "HEAD"]),
            &self.as_owner(),
        )?)
    }

    fn clone_fresh(&self, runner: &dyn Runner) -> Result<()> {
        let dir = self.dir.display().to_string();
        runner.run(
            &CommandLine::argv(["git", "clone", self.remote.as_str(), dir.as_str()]),
            &RunOptions::new(),
        )?;

        if let Some(reference) = &self.reference {
            runner.run(
                &CommandLine::argv(["git", "checkout", reference.as_str()]),
                &RunOptions::new().in_dir(&self.dir),
            )?;
        }

        let owner = format!("{0}:{0}", self.owner);
        runner.run(
            &CommandLine::argv(["chown", "-R", owner.as_str(), dir.as_str()]),
            &RunOptions::new(),
        )?;
        Ok(())
    }

    fn update(&self, runner: &dyn Runner) -> Result<()> {
        let opts = self.as_owner();
        runner.run(
            &CommandLine::argv(["git", "fetch", "--all", "--tags", "--prune"]),
            &opts,
        )?;

        let Some(reference) = &self.reference else {
            let pull = runner.run(
                &CommandLine::argv(["git", "pull", "--ff-only"]),
                &opts.clone().unchecked(),
            )?;
            if !pull.success {
                log::warn!(
                    "git pull --ff-only failed in {}; keeping current revision",
                    self.dir.display()
                );
            }
            return Ok(());
        };

        let remote_branch = format!("refs/remotes/origin/{reference}");
        let is_branch = runner.probe(
            &CommandLine::argv(["git", "rev-parse", "--verify", "--quiet", remote_branch.as_str()]),
            &opts,
        );
        let target = if is_branch {
            format!("origin/{reference}")
        } else {
            reference.clone()
        };

        runner.run(
            &CommandLine::argv(["git", "reset", "--hard", target.as_str()]),
            &opts,
        )?;
        Ok(())
    }
}

impl Resource for Checkout {
    fn id(&self) -> String {
        format!("checkout:{}", self.dir.display())
    }

    fn description(&self) -> String {
        match &self.reference {
            Some(reference) => format!("Checkout {} at {reference}", self.remote),
            None => format!("Checkout {}", self.remote),
        }
    }

    fn resource_type(&self) -> &'static str {
        "checkout"
    }

    fn current_state(&self, _runner: &dyn Runner) -> Result<ResourceState> {
        Ok(match self.check_current() {
            CheckoutState::Missing => ResourceState::Absent,
            CheckoutState::NotARepository => ResourceState::Modified {
                from: "directory without .git".to_string(),
                to: "git checkout".to_string(),
            },
            CheckoutState::Repository => self.desired_state(),
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: self.reference.clone(),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyContext::dry_run_result());
        }

        match self.check_current() {
            CheckoutState::Missing => {
                self.clone_fresh(ctx.runner)?;
                Ok(ApplyResult::Created)
            }
            CheckoutState::NotARepository => bail!(
                "{} exists but is not a git checkout; move it aside and re-run",
                self.dir.display()
            ),
            CheckoutState::Repository => {
                let before = self.head(ctx.runner)?;
                self.update(ctx.runner)?;
                let after = self.head(ctx.runner)?;

                if before == after {
                    Ok(ApplyResult::NoChange)
                } else {
                    log::info!("checkout moved {before} -> {after}");
                    Ok(ApplyResult::Modified)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdkit::testing::{Reply, ScriptedRunner};
    use std::fs;

    const REMOTE: &str = "https://example.org/tube.git";

    fn apply(checkout: &Checkout, runner: &ScriptedRunner) -> Result<ApplyResult> {
        let mut ctx = ApplyContext::new(false, runner);
        checkout.apply(&mut ctx)
    }

    #[test]
    fn test_fresh_clone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("peertube");
        let checkout = Checkout::new(REMOTE, &target, "peertube", Some("production"));
        let runner = ScriptedRunner::new();

        assert!(matches!(apply(&checkout, &runner).unwrap(), ApplyResult::Created));
        let commands = runner.commands();
        assert!(commands[0].starts_with("git clone https://example.org/tube.git"));
        assert_eq!(commands[1], "git checkout production");
        assert!(commands[2].starts_with("chown -R peertube:peertube"));
    }

    #[test]
    fn test_branch_update_resets_to_origin() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let checkout = Checkout::new(REMOTE, dir.path(), "peertube", Some("production"));
        let runner = ScriptedRunner::new().on("rev-parse HEAD", Reply::stdout("abc123\n"));

        assert!(matches!(apply(&checkout, &runner).unwrap(), ApplyResult::NoChange));
        assert!(runner.ran("git fetch --all --tags --prune"));
        assert!(runner.ran("git reset --hard origin/production"));
        assert!(!runner.ran("git clone"));

        let fetch = runner
            .invocations()
            .into_iter()
            .find(|i| i.command.starts_with("git fetch"))
            .unwrap();
        assert_eq!(fetch.run_as.as_deref(), Some("peertube"));
        assert_eq!(fetch.cwd.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_tag_update_resets_to_tag() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let checkout = Checkout::new(REMOTE, dir.path(), "peertube", Some("v6.0.0"));
        let runner = ScriptedRunner::new().on("refs/remotes/origin/v6.0.0", Reply::fail(1));

        apply(&checkout, &runner).unwrap();
        assert!(runner.ran("git reset --hard v6.0.0"));
        assert!(!runner.ran("reset --hard origin/"));
    }

    #[test]
    fn test_unpinned_pull_failure_is_warned() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let checkout = Checkout::new(REMOTE, dir.path(), "peertube", None);
        let runner = ScriptedRunner::new().on("git pull --ff-only", Reply::fail(1));

        assert!(apply(&checkout, &runner).is_ok());
        assert!(!runner.ran("git reset"));
    }

    #[test]
    fn test_non_repository_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = Checkout::new(REMOTE, dir.path(), "peertube", Some("production"));
        let runner = ScriptedRunner::new();

        assert!(matches!(
            checkout.current_state(&runner).unwrap(),
            ResourceState::Modified { .. }
        ));
        assert!(apply(&checkout, &runner).is_err());
        assert!(runner.commands().is_empty());
    }
}
