//! The rendered configuration document on disk.

use anyhow::{Context, Result, bail};
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::options::Options;
use crate::render::render;

const MODE: u32 = 0o600;

/// `production.yaml`, replaced in full on every run.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub owner: String,
    pub options: Options,
}

impl ConfigFile {
    pub fn new(path: impl AsRef<Path>, owner: &str, options: Options) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            owner: owner.to_string(),
            options,
        }
    }

    /// Replace the file through a fresh temp file and a rename, so whatever
    /// sits at the path (a symlink included) is swapped out, never written
    /// through.
    fn write(&self, content: &str) -> Result<()> {
        let parent = self
            .path
            .parent()
            .with_context(|| format!("{} has no parent directory", self.path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
        if fs::symlink_metadata(parent)?.file_type().is_symlink() {
            bail!("Refusing to write into symlinked {}", parent.display());
        }

        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(MODE))
            .context("Failed to chmod temp file")?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl Resource for ConfigFile {
    fn id(&self) -> String {
        format!("config_file:{}", self.path.display())
    }

    fn description(&self) -> String {
        format!("Render {}", self.path.display())
    }

    fn resource_type(&self) -> &'static str {
        "config_file"
    }

    fn current_state(&self, _runner: &dyn Runner) -> Result<ResourceState> {
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.is_file() => Ok(ResourceState::Present { details: None }),
            Ok(_) => Ok(ResourceState::Modified {
                from: "not a regular file".to_string(),
                to: "regular file".to_string(),
            }),
            Err(_) => Ok(ResourceState::Absent),
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present { details: None }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyContext::dry_run_result());
        }

        let content = render(&self.options)?.to_yaml()?;
        let existed = fs::symlink_metadata(&self.path).is_ok();
        self.write(&content)?;

        // -h: never follow a link swapped in after the rename
        let owner = format!("{0}:{0}", self.owner);
        let path = self.path.display().to_string();
        ctx.runner.run(
            &CommandLine::argv(["chown", "-h", owner.as_str(), path.as_str()]),
            &RunOptions::new(),
        )?;

        log::info!("Wrote {}", self.path.display());
        Ok(if existed {
            ApplyResult::Modified
        } else {
            ApplyResult::Created
        })
    }
}
