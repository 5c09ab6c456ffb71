//! OS package set: base tools, Node.js, Yarn and the backing services.

use anyhow::Result;
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
use regex::Regex;

pub const BASE_PACKAGES: &[&str] = &[
    "curl",
    "wget",
    "gnupg",
    "lsb-release",
    "unzip",
    "git",
    "vim",
    "ca-certificates",
    "ufw",
];

pub const SERVICE_PACKAGES: &[&str] = &[
    "postgresql",
    "postgresql-contrib",
    "redis-server",
    "ffmpeg",
    "nginx",
    "certbot",
    "python3-certbot-nginx",
];

pub const NODE_MAJOR: u32 = 20;

const NODESOURCE_SETUP: &str = "curl -fsSL https://deb.nodesource.com/setup_20.x | bash -";

/// Everything installed through apt, plus the Node.js runtime and Yarn.
#[derive(Debug, Clone)]
pub struct PackageSet {
    pub node_major: u32,
}

impl Default for PackageSet {
    fn default() -> Self {
        Self {
            node_major: NODE_MAJOR,
        }
    }
}

/// Parse the major version out of `node -v` output (`v20.11.1`).
pub fn parse_node_major(output: &str) -> Option<u32> {
    let re = Regex::new(r"^v(\d+)\.").ok()?;
    re.captures(output.trim())?.get(1)?.as_str().parse().ok()
}

fn apt_install(packages: &[&str]) -> CommandLine {
    let mut argv = vec!["apt-get", "install", "-y"];
    argv.extend_from_slice(packages);
    CommandLine::argv(argv)
}

fn noninteractive() -> RunOptions {
    RunOptions::new().env("DEBIAN_FRONTEND", "noninteractive")
}

impl PackageSet {
    fn installed_node_major(runner: &dyn Runner) -> Option<u32> {
        let output = runner
            .run(
                &CommandLine::argv(["node", "-v"]),
                &RunOptions::new().unchecked().captured(),
            )
            .ok()
            .filter(|o| o.success)?;
        parse_node_major(&output.stdout_str())
    }

    fn packages_installed(runner: &dyn Runner) -> bool {
        let mut argv = vec!["dpkg", "-s"];
        argv.extend_from_slice(BASE_PACKAGES);
        argv.extend_from_slice(SERVICE_PACKAGES);
        runner.probe(&CommandLine::argv(argv), &RunOptions::new())
    }

    fn has_yarn(runner: &dyn Runner) -> bool {
        runner.probe(&CommandLine::shell("command -v yarn"), &RunOptions::new())
    }

    fn ensure_node(&self, runner: &dyn Runner) -> Result<()> {
        match Self::installed_node_major(runner) {
            Some(major) if major == self.node_major => {
                log::debug!("node {major} already installed");
                return Ok(());
            }
            Some(major) => log::info!("node {major} installed; switching to {}", self.node_major),
            None => log::info!("node not installed"),
        }

        runner.run(&CommandLine::shell(NODESOURCE_SETUP), &RunOptions::new())?;
        runner.run(&apt_install(&["nodejs"]), &noninteractive())?;
        Ok(())
    }

    fn ensure_yarn(runner: &dyn Runner) -> Result<()> {
        if Self::has_yarn(runner) {
            return Ok(());
        }
        let output = runner.run(
            &CommandLine::argv(["npm", "install", "-g", "yarn"]),
            &RunOptions::new().unchecked(),
        )?;
        if !output.success {
            log::warn!("npm install -g yarn failed; dependency install will likely fail");
        }
        Ok(())
    }
}

impl Resource for PackageSet {
    fn id(&self) -> String {
        "packages:system".to_string()
    }

    fn description(&self) -> String {
        format!("Install OS packages, Node.js {} and Yarn", self.node_major)
    }

    fn resource_type(&self) -> &'static str {
        "packages"
    }

    fn current_state(&self, runner: &dyn Runner) -> Result<ResourceState> {
        if !Self::packages_installed(runner) {
            return Ok(ResourceState::Absent);
        }
        match Self::installed_node_major(runner) {
            None => Ok(ResourceState::Absent),
            Some(major) if major != self.node_major => Ok(ResourceState::Modified {
                from: format!("node {major}"),
                to: format!("node {}", self.node_major),
            }),
            Some(_) if !Self::has_yarn(runner) => Ok(ResourceState::Modified {
                from: "yarn missing".to_string(),
                to: "yarn installed".to_string(),
            }),
            Some(_) => Ok(self.desired_state()),
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(format!("node {}", self.node_major)),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyContext::dry_run_result());
        }

        let runner = ctx.runner;
        let before = self.current_state(runner)?;

        runner.run(
            &CommandLine::argv(["apt-get", "update", "-y"]),
            &RunOptions::new(),
        )?;
        runner.run(&apt_install(BASE_PACKAGES), &noninteractive())?;
        self.ensure_node(runner)?;
        Self::ensure_yarn(runner)?;
        runner.run(&apt_install(SERVICE_PACKAGES), &noninteractive())?;

        let enable = runner.run(
            &CommandLine::argv([
                "systemctl",
                "enable",
                "--now",
                "redis-server",
                "postgresql",
                "nginx",
            ]),
            &RunOptions::new().unchecked(),
        )?;
        if !enable.success {
            log::warn!("could not enable redis-server/postgresql/nginx");
        }

        Ok(match before {
            ResourceState::Present { .. } => ApplyResult::NoChange,
            ResourceState::Modified { .. } => ApplyResult::Modified,
            _ => ApplyResult::Created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdkit::testing::{Reply, ScriptedRunner};

    fn apply(runner: &ScriptedRunner) -> Result<ApplyResult> {
        let mut ctx = ApplyContext::new(false, runner);
        PackageSet::default().apply(&mut ctx)
    }

    #[test]
    fn test_parse_node_major() {
        assert_eq!(parse_node_major("v20.11.1\n"), Some(20));
        assert_eq!(parse_node_major("v18.0.0"), Some(18));
        assert_eq!(parse_node_major("20.1.0"), None);
        assert_eq!(parse_node_major(""), None);
    }

    #[test]
    fn test_fresh_host_installs_node_and_yarn() {
        let runner = ScriptedRunner::new()
            .on("dpkg -s", Reply::fail(1))
            .on("node -v", Reply::fail(127))
            .on("command -v yarn", Reply::fail(1));

        assert!(matches!(apply(&runner).unwrap(), ApplyResult::Created));
        assert!(runner.ran("apt-get update -y"));
        assert!(runner.ran("deb.nodesource.com/setup_20.x | bash -"));
        assert!(runner.ran("apt-get install -y nodejs"));
        assert!(runner.ran("npm install -g yarn"));
        assert!(runner.ran("apt-get install -y postgresql postgresql-contrib"));
        assert!(runner.ran("systemctl enable --now redis-server postgresql nginx"));

        let setup = runner
            .invocations()
            .into_iter()
            .find(|i| i.command.contains("nodesource"))
            .unwrap();
        assert!(setup.shell);
    }

    #[test]
    fn test_provisioned_host_skips_node_and_yarn() {
        let runner = ScriptedRunner::new().on("node -v", Reply::stdout("v20.11.1\n"));

        assert!(matches!(apply(&runner).unwrap(), ApplyResult::NoChange));
        assert!(!runner.ran("nodesource"));
        assert!(!runner.ran("npm install"));
        assert!(runner.ran("apt-get install -y curl"));
    }

    #[test]
    fn test_wrong_node_major_is_replaced() {
        let runner = ScriptedRunner::new().on("node -v", Reply::stdout("v18.19.0"));
        assert!(matches!(apply(&runner).unwrap(), ApplyResult::Modified));
        assert!(runner.ran("apt-get install -y nodejs"));
    }

    #[test]
    fn test_apt_failure_is_fatal() {
        let runner = ScriptedRunner::new().on("apt-get update", Reply::fail(100));
        let err = apply(&runner).unwrap_err();
        assert_eq!(err.downcast_ref::<cmdkit::Error>().unwrap().exit_code(), Some(100));
        assert!(!runner.ran("apt-get install"));
    }

    #[test]
    fn test_yarn_and_enable_failures_are_tolerated() {
        let runner = ScriptedRunner::new()
            .on("node -v", Reply::stdout("v20.1.0"))
            .on("command -v yarn", Reply::fail(1))
            .on("npm install", Reply::fail(1))
            .on("systemctl enable", Reply::fail(1));
        assert!(apply(&runner).is_ok());
    }
}
