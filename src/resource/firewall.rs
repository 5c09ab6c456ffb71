//! Host firewall rules for HTTP and HTTPS.

use anyhow::Result;
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Severity};

pub const RULES: &[&str] = &["80/tcp", "443/tcp"];

#[derive(Debug, Clone, Default)]
pub struct Firewall;

impl Firewall {
    fn has_ufw(runner: &dyn Runner) -> bool {
        runner.probe(&CommandLine::shell("command -v ufw"), &RunOptions::new())
    }
}

impl Resource for Firewall {
    fn id(&self) -> String {
        "firewall:ufw".to_string()
    }

    fn description(&self) -> String {
        format!("Allow {} through ufw", RULES.join(", "))
    }

    fn resource_type(&self) -> &'static str {
        "firewall"
    }

    fn severity(&self) -> Severity {
        Severity::BestEffort
    }

    fn current_state(&self, runner: &dyn Runner) -> Result<ResourceState> {
        if !Self::has_ufw(runner) {
            return Ok(ResourceState::Unknown);
        }
        let status = runner.capture(
            &CommandLine::argv(["ufw", "status"]),
            &RunOptions::new().unchecked(),
        )?;
        if RULES.iter().all(|rule| status.contains(rule)) {
            Ok(self.desired_state())
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

        if !Self::has_ufw(ctx.runner) {
            return Ok(ApplyResult::Skipped {
                reason: "ufw not installed".to_string(),
            });
        }

        for rule in RULES.iter().copied() {
            ctx.runner
                .run(&CommandLine::argv(["ufw", "allow", rule]), &RunOptions::new())?;
        }
        Ok(ApplyResult::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdkit::testing::{Reply, ScriptedRunner};

    #[test]
    fn test_allows_web_ports() {
        let runner = ScriptedRunner::new();
        let mut ctx = ApplyContext::new(false, &runner);

        Firewall.apply(&mut ctx).unwrap();
        assert!(runner.ran("ufw allow 80/tcp"));
        assert!(runner.ran("ufw allow 443/tcp"));
    }

    #[test]
    fn test_detects_existing_rules() {
        let runner = ScriptedRunner::new().on(
            "ufw status",
            Reply::stdout("Status: active\n80/tcp ALLOW Anywhere\n443/tcp ALLOW Anywhere\n"),
        );
        assert_eq!(
            Firewall.current_state(&runner).unwrap(),
            Firewall.desired_state()
        );

        runner.set("ufw status", Reply::stdout("Status: inactive\n"));
        assert_eq!(
            Firewall.current_state(&runner).unwrap(),
            ResourceState::Absent
        );
    }

    #[test]
    fn test_skipped_without_ufw() {
        let runner = ScriptedRunner::new().on("command -v ufw", Reply::fail(1));
        let mut ctx = ApplyContext::new(false, &runner);

        assert!(matches!(
            Firewall.apply(&mut ctx).unwrap(),
            ApplyResult::Skipped { .. }
        ));
        assert!(!runner.ran("ufw allow"));
    }
}
