//! Provisioning run: resolve the domain, build the plan, execute it.

use anyhow::{Context, Result};
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ExecuteOptions, ExecuteSummary, ExecutionPlan, ProgressCallback, execute};

use crate::layout::Layout;
use crate::options::Options;
use crate::render::render;
use crate::resource::{
    Certificate, Checkout, ConfigFile, Database, DatabaseRole, Dependencies, Firewall, PackageSet,
    ProxySite, ServiceAccount, SupervisorUnit, database,
};

/// Upstream repository
pub const REMOTE: &str = "https://github.com/Chocobozzz/PeerTube.git";

const FALLBACK_ADDRESS: &str = "127.0.0.1";

/// Outcome of a completed run.
#[derive(Debug)]
pub struct Report {
    pub url: String,
    pub summary: ExecuteSummary,
}

/// First address printed by `hostname -I`, or loopback.
pub fn detect_address(runner: &dyn Runner) -> String {
    runner
        .capture(
            &CommandLine::argv(["hostname", "-I"]),
            &RunOptions::new().unchecked(),
        )
        .ok()
        .and_then(|out| out.split_whitespace().next().map(str::to_string))
        .unwrap_or_else(|| FALLBACK_ADDRESS.to_string())
}

/// Fix the domain for the rest of the run.
pub fn resolve_domain(options: Options, runner: &dyn Runner) -> Options {
    if !options.domain.is_empty() {
        return options;
    }
    let address = detect_address(runner);
    log::info!("PT_DOMAIN not set; using {address}");
    options.with_domain(address)
}

/// Public URL of the instance.
pub fn access_url(options: &Options) -> String {
    format!("{}://{}", options.scheme(), options.domain)
}

/// Build the ordered plan.
///
/// Options must already carry a resolved domain. The document is rendered
/// once up front and the database identifiers are checked, so nothing runs
/// with a value the config step would later reject.
pub fn build_plan(options: &Options, layout: &Layout) -> Result<ExecutionPlan> {
    let web_port = render(options)?.webserver.port;
    database::validate_identifier("PT_DB_USER", &options.database.user)?;
    database::validate_identifier("PT_DB_NAME", &options.database.name)?;

    let user = options.user.as_str();
    let mut plan = ExecutionPlan::new();

    plan.push(Box::new(PackageSet::default()));
    plan.push(Box::new(ServiceAccount::new(user, &layout.home)));
    plan.push(Box::new(DatabaseRole::new(
        &options.database.user,
        &options.database.password,
    )));
    plan.push(Box::new(Database::new(
        &options.database.name,
        &options.database.user,
    )));
    plan.push(Box::new(Checkout::new(
        REMOTE,
        &layout.checkout,
        user,
        options.reference.as_deref(),
    )));
    plan.push(Box::new(Dependencies::new(&layout.checkout, user)));
    plan.push(Box::new(ConfigFile::new(
        &layout.config_file,
        user,
        options.clone(),
    )));
    plan.push(Box::new(ProxySite::new(
        &layout.nginx_available,
        &layout.nginx_enabled,
        &options.domain,
        web_port,
    )));
    plan.push(Box::new(Certificate::new(
        &options.domain,
        &options.admin_contact(),
        options.https,
    )));
    plan.push(Box::new(SupervisorUnit::new(
        &layout.unit_file,
        user,
        &layout.checkout,
    )));
    plan.push(Box::new(Firewall));

    Ok(plan)
}

/// Run every step against the host.
///
/// The first fatal failure is returned unchanged.
pub fn provision<P: ProgressCallback>(
    options: Options,
    layout: &Layout,
    exec: &ExecuteOptions,
    runner: &dyn Runner,
    progress: &mut P,
) -> Result<Report> {
    let options = resolve_domain(options, runner);
    let plan = build_plan(&options, layout).context("Invalid options")?;

    log::debug!("plan: {plan:?}");
    let summary = execute(&plan, exec, runner, progress)?;

    Ok(Report {
        url: access_url(&options),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdkit::testing::{Reply, ScriptedRunner};
    use declarative::{ApplyResult, NoProgress};
    use std::fs;
    use std::path::Path;

    fn scratch_layout(root: &Path) -> Layout {
        Layout::with_root(root, root.join("var/www"))
    }

    /// A host where every resource already exists.
    fn provisioned(root: &Path) -> (Layout, ScriptedRunner) {
        let layout = scratch_layout(root);
        fs::create_dir_all(layout.checkout.join(".git")).unwrap();
        fs::create_dir_all(layout.unit_file.parent().unwrap()).unwrap();
        fs::write(&layout.unit_file, "# existing\n").unwrap();

        let runner = ScriptedRunner::new()
            .on("node -v", Reply::stdout("v20.11.1\n"))
            .on("pg_roles", Reply::stdout("1\n"))
            .on("pg_database", Reply::stdout("1\n"))
            .on("rev-parse HEAD", Reply::stdout("abc123\n"));
        (layout, runner)
    }

    fn options(domain: &str) -> Options {
        Options::default().with_domain(domain)
    }

    fn run(options: Options, layout: &Layout, runner: &ScriptedRunner) -> Result<Report> {
        provision(
            options,
            layout,
            &ExecuteOptions::default(),
            runner,
            &mut NoProgress,
        )
    }

    #[test]
    fn test_second_run_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, runner) = provisioned(dir.path());

        run(options("video.example.org"), &layout, &runner).unwrap();
        let first = runner.commands();
        runner.clear();
        run(options("video.example.org"), &layout, &runner).unwrap();
        let second = runner.commands();

        for create in ["adduser", "CREATE USER", "CREATE DATABASE", "git clone"] {
            assert!(
                !first.iter().chain(&second).any(|c| c.contains(create)),
                "{create} should not run on a provisioned host"
            );
        }
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&layout.unit_file).unwrap(), "# existing\n");
    }

    #[test]
    fn test_fresh_host_runs_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let layout = scratch_layout(dir.path());
        let runner = ScriptedRunner::new()
            .on("dpkg -s", Reply::fail(1))
            .on("node -v", Reply::fail(127))
            .on("id -u", Reply::fail(1))
            .on("pg_roles", Reply::stdout(""))
            .on("pg_database", Reply::stdout(""));

        let report = run(options("video.example.org"), &layout, &runner).unwrap();

        let commands = runner.commands();
        let position = |pattern: &str| {
            commands
                .iter()
                .position(|c| c.contains(pattern))
                .unwrap_or_else(|| panic!("{pattern} not run"))
        };
        let order = [
            "apt-get update",
            "adduser",
            "CREATE USER",
            "CREATE DATABASE",
            "git clone",
            "yarn install",
            "nginx -t",
            "systemctl daemon-reload",
            "ufw allow 80/tcp",
        ];
        for pair in order.windows(2) {
            assert!(position(pair[0]) < position(pair[1]), "{pair:?}");
        }

        assert!(layout.config_file.is_file());
        assert!(layout.nginx_enabled.is_symlink());
        assert!(layout.unit_file.is_file());
        assert_eq!(report.url, "http://video.example.org");
        assert!(report.summary.is_success());
        assert!(matches!(
            report.summary.outcome("certificate:video.example.org"),
            Some(ApplyResult::Skipped { .. })
        ));
    }

    #[test]
    fn test_certbot_never_runs_for_ip_address() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, runner) = provisioned(dir.path());
        let mut opts = options("203.0.113.7");
        opts.https = true;

        run(opts, &layout, &runner).unwrap();
        assert!(!runner.ran("certbot"));
    }

    #[test]
    fn test_empty_domain_uses_detected_address_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, runner) = provisioned(dir.path());
        runner.set("hostname -I", Reply::stdout("10.0.0.5 172.17.0.1 \n"));

        let report = run(Options::default(), &layout, &runner).unwrap();

        assert_eq!(report.url, "http://10.0.0.5");
        let site = fs::read_to_string(&layout.nginx_available).unwrap();
        assert!(site.contains("server_name 10.0.0.5;"));
        let config = fs::read_to_string(&layout.config_file).unwrap();
        assert!(config.contains("no-reply@10.0.0.5"));
        assert_eq!(runner.count("hostname -I"), 1);
    }

    #[test]
    fn test_domain_detection_falls_back_to_loopback() {
        let runner = ScriptedRunner::new().on("hostname -I", Reply::fail(1));
        assert_eq!(detect_address(&runner), "127.0.0.1");

        let runner = ScriptedRunner::new().on("hostname -I", Reply::stdout("  \n"));
        assert_eq!(detect_address(&runner), "127.0.0.1");
    }

    #[test]
    fn test_fatal_failure_aborts_with_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, runner) = provisioned(dir.path());
        runner.set("yarn install", Reply::fail(1));

        let err = run(options("video.example.org"), &layout, &runner).unwrap_err();
        let cmd = err.downcast_ref::<cmdkit::Error>().unwrap();
        assert!(cmd.is_command_failure());
        assert!(!layout.config_file.exists());
        assert!(!runner.ran("nginx -t"));
    }

    #[test]
    fn test_best_effort_failures_do_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, runner) = provisioned(dir.path());
        runner.set("nginx -t", Reply::fail(1));
        runner.set("ufw allow", Reply::fail(1));

        let report = run(options("video.example.org"), &layout, &runner).unwrap();
        assert_eq!(report.summary.failed, 2);
        assert!(!runner.ran("systemctl reload nginx"));
        assert!(runner.ran("systemctl restart peertube"));
    }

    #[test]
    fn test_invalid_port_stops_before_any_step() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, runner) = provisioned(dir.path());
        let mut opts = options("video.example.org");
        opts.web_port = 70_000;

        let err = run(opts, &layout, &runner).unwrap_err();
        assert!(
            err.chain()
                .any(|e| e.downcast_ref::<crate::error::ConfigError>().is_some())
        );
        assert!(runner.commands().is_empty());
    }

    fn assert_rejected_on_fresh_host(opts: Options, field: &str) {
        let dir = tempfile::tempdir().unwrap();
        let layout = scratch_layout(dir.path());
        let runner = ScriptedRunner::new();

        let err = run(opts, &layout, &runner).unwrap_err();
        let rejected = err.chain().any(|e| {
            matches!(
                e.downcast_ref::<crate::error::ConfigError>(),
                Some(crate::error::ConfigError::Invalid { field: f, .. }) if *f == field
            )
        });
        assert!(rejected, "{field}: {err:#}");
        assert!(runner.commands().is_empty(), "{field}: host was touched");
    }

    #[test]
    fn test_invalid_backing_service_ports_stop_fresh_host_early() {
        let mut opts = options("video.example.org");
        opts.smtp.port = 70_000;
        assert_rejected_on_fresh_host(opts, "PT_SMTP_PORT");

        let mut opts = options("video.example.org");
        opts.database.port = 0;
        assert_rejected_on_fresh_host(opts, "PT_DB_PORT");
    }

    #[test]
    fn test_dry_run_only_detects() {
        let dir = tempfile::tempdir().unwrap();
        let layout = scratch_layout(dir.path());
        let runner = ScriptedRunner::new();
        let exec = ExecuteOptions { dry_run: true };

        let report = provision(
            options("video.example.org"),
            &layout,
            &exec,
            &runner,
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(report.summary.skipped, 11);
        assert!(runner.commands().is_empty());
        assert!(!layout.config_file.exists());
    }
}
