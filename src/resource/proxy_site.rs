//! nginx reverse-proxy site.

use anyhow::{Context, Result};
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Severity};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Upload limit for video files
pub const MAX_BODY_SIZE: &str = "8G";

/// Render the site definition.
///
/// An empty server name becomes the catch-all `_`.
pub fn render_site(server_name: &str, port: u16) -> String {
    let server_name = if server_name.trim().is_empty() {
        "_"
    } else {
        server_name.trim()
    };

    format!(
        "server {{
  server_name {server_name};
  listen 80;
  listen [::]:80;

  client_max_body_size {MAX_BODY_SIZE};

  location / {{
    proxy_pass http://127.0.0.1:{port};
    proxy_http_version 1.1;
    proxy_set_header Host $host;
    proxy_set_header X-Real-IP $remote_addr;
    proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
    proxy_set_header X-Forwarded-Proto $scheme;
    proxy_set_header Upgrade $http_upgrade;
    proxy_set_header Connection \"upgrade\";
  }}
}}
"
    )
}

#[derive(Debug, Clone)]
pub struct ProxySite {
    pub available: PathBuf,
    pub enabled: PathBuf,
    pub server_name: String,
    pub port: u16,
}

impl ProxySite {
    pub fn new(
        available: impl AsRef<Path>,
        enabled: impl AsRef<Path>,
        server_name: &str,
        port: u16,
    ) -> Self {
        Self {
            available: available.as_ref().to_path_buf(),
            enabled: enabled.as_ref().to_path_buf(),
            server_name: server_name.to_string(),
            port,
        }
    }

    fn write_site(&self) -> Result<()> {
        if let Some(parent) = self.available.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.available, render_site(&self.server_name, self.port))
            .with_context(|| format!("Failed to write {}", self.available.display()))
    }

    fn link_site(&self) -> Result<()> {
        if self.enabled.is_symlink() || self.enabled.exists() {
            return Ok(());
        }
        if let Some(parent) = self.enabled.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        match std::os::unix::fs::symlink(&self.available, &self.enabled) {
            Err(e) if e.kind() != io::ErrorKind::AlreadyExists => Err(e).with_context(|| {
                format!(
                    "Failed to link {} -> {}",
                    self.enabled.display(),
                    self.available.display()
                )
            }),
            _ => Ok(()),
        }
    }
}

impl Resource for ProxySite {
    fn id(&self) -> String {
        "proxy_site:peertube".to_string()
    }

    fn description(&self) -> String {
        format!(
            "nginx site {} -> 127.0.0.1:{}",
            self.available.display(),
            self.port
        )
    }

    fn resource_type(&self) -> &'static str {
        "proxy_site"
    }

    fn severity(&self) -> Severity {
        Severity::BestEffort
    }

    fn current_state(&self, _runner: &dyn Runner) -> Result<ResourceState> {
        let Ok(current) = fs::read_to_string(&self.available) else {
            return Ok(ResourceState::Absent);
        };
        if current != render_site(&self.server_name, self.port) {
            return Ok(ResourceState::Modified {
                from: "stale site definition".to_string(),
                to: format!("proxy to port {}", self.port),
            });
        }
        if !self.enabled.exists() {
            return Ok(ResourceState::Modified {
                from: "site disabled".to_string(),
                to: "site enabled".to_string(),
            });
        }
        Ok(self.desired_state())
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(format!("proxy to port {}", self.port)),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyContext::dry_run_result());
        }

        let existed = self.available.exists();
        self.write_site()?;
        self.link_site()?;

        let test = ctx.runner.run(
            &CommandLine::argv(["nginx", "-t"]),
            &RunOptions::new().unchecked().captured(),
        )?;
        if !test.success {
            return Ok(ApplyResult::Failed {
                error: format!(
                    "nginx -t rejected the configuration; not reloading: {}",
                    test.stderr_str().trim()
                ),
            });
        }

        ctx.runner.run(
            &CommandLine::argv(["systemctl", "reload", "nginx"]),
            &RunOptions::new(),
        )?;

        Ok(if existed {
            ApplyResult::Modified
        } else {
            ApplyResult::Created
        })
    }
}
