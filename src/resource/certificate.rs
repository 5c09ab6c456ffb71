//! TLS certificate through certbot's nginx plugin.

use anyhow::Result;
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Severity};
use std::path::Path;

use crate::options::is_ipv4_literal;

const LIVE_DIR: &str = "/etc/letsencrypt/live";

#[derive(Debug, Clone)]
pub struct Certificate {
    pub domain: String,
    pub contact: String,
    pub https: bool,
}

impl Certificate {
    pub fn new(domain: &str, contact: &str, https: bool) -> Self {
        Self {
            domain: domain.to_string(),
            contact: contact.to_string(),
            https,
        }
    }

    /// Reason the certificate is not requested, if any.
    fn skip_reason(&self) -> Option<String> {
        if !self.https {
            Some("HTTPS disabled".to_string())
        } else if is_ipv4_literal(&self.domain) {
            Some(format!("{} is an IP address", self.domain))
        } else {
            None
        }
    }
}

impl Resource for Certificate {
    fn id(&self) -> String {
        format!("certificate:{}", self.domain)
    }

    fn description(&self) -> String {
        format!("TLS certificate for {}", self.domain)
    }

    fn resource_type(&self) -> &'static str {
        "certificate"
    }

    fn severity(&self) -> Severity {
        Severity::BestEffort
    }

    fn current_state(&self, _runner: &dyn Runner) -> Result<ResourceState> {
        if self.skip_reason().is_some() {
            return Ok(self.desired_state());
        }
        // Expiry is certbot's business; only presence is reported
        if Path::new(LIVE_DIR).join(&self.domain).is_dir() {
            Ok(self.desired_state())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: self.skip_reason().map(|reason| format!("not required: {reason}")),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyContext::dry_run_result());
        }

        if let Some(reason) = self.skip_reason() {
            return Ok(ApplyResult::Skipped { reason });
        }

        ctx.runner.run(
            &CommandLine::argv([
                "certbot",
                "--nginx",
                "--non-interactive",
                "--agree-tos",
                "--redirect",
                "--keep-until-expiring",
                "-m",
                self.contact.as_str(),
                "-d",
                self.domain.as_str(),
            ]),
            &RunOptions::new(),
        )?;
        Ok(ApplyResult::Modified)
    }
}
