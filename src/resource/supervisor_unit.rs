//! systemd unit that runs the service.
//!
//! The unit file is only written when missing so local overrides survive
//! re-runs. The service is restarted every run to pick up the new
//! configuration.

use anyhow::{Context, Result};
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Severity};
use std::fs;
use std::path::{Path, PathBuf};

pub const SERVICE: &str = "peertube";

/// Render the unit file.
pub fn render_unit(user: &str, checkout: &Path) -> String {
    let dir = checkout.display();
    format!(
        "[Unit]
Description=PeerTube daemon
After=network.target postgresql.service redis-server.service

[Service]
Type=simple
User={user}
Group={user}
WorkingDirectory={dir}
Environment=NODE_ENV=production
Environment=NODE_CONFIG_DIR={dir}/config
ExecStart=/usr/bin/node dist/server
SyslogIdentifier={SERVICE}
Restart=always
RestartSec=10

[Install]
WantedBy=multi-user.target
"
    )
}

fn systemctl(args: &[&str]) -> CommandLine {
    CommandLine::argv(std::iter::once("systemctl").chain(args.iter().copied()))
}

#[derive(Debug, Clone)]
pub struct SupervisorUnit {
    pub path: PathBuf,
    pub user: String,
    pub checkout: PathBuf,
}

impl SupervisorUnit {
    pub fn new(path: impl AsRef<Path>, user: &str, checkout: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            user: user.to_string(),
            checkout: checkout.as_ref().to_path_buf(),
        }
    }

    fn write_unit(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, render_unit(&self.user, &self.checkout))
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl Resource for SupervisorUnit {
    fn id(&self) -> String {
        format!("supervisor_unit:{SERVICE}")
    }

    fn description(&self) -> String {
        format!("systemd unit {}", self.path.display())
    }

    fn resource_type(&self) -> &'static str {
        "supervisor_unit"
    }

    fn severity(&self) -> Severity {
        Severity::BestEffort
    }

    fn current_state(&self, runner: &dyn Runner) -> Result<ResourceState> {
        if !self.path.exists() {
            return Ok(ResourceState::Absent);
        }
        let active = runner.probe(&systemctl(&["is-active", "--quiet", SERVICE]), &RunOptions::new());
        Ok(ResourceState::Present {
            details: Some(if active { "active" } else { "inactive" }.to_string()),
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some("active".to_string()),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyContext::dry_run_result());
        }

        let created = !self.path.exists();
        if created {
            self.write_unit()?;
            log::info!("Wrote {}", self.path.display());
        } else {
            log::info!("{} exists; leaving it untouched", self.path.display());
        }

        ctx.runner.run(&systemctl(&["daemon-reload"]), &RunOptions::new())?;

        let enable = ctx
            .runner
            .run(&systemctl(&["enable", SERVICE]), &RunOptions::new().unchecked())?;
        if !enable.success {
            log::warn!("systemctl enable {SERVICE} failed");
        }

        let restart = ctx
            .runner
            .run(&systemctl(&["restart", SERVICE]), &RunOptions::new().unchecked())?;
        if !restart.success {
            return Ok(ApplyResult::Failed {
                error: format!("systemctl restart {SERVICE} failed; see journalctl -u {SERVICE}"),
            });
        }

        Ok(if created {
            ApplyResult::Created
        } else {
            ApplyResult::Modified
        })
    }
}
