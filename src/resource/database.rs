//! PostgreSQL role and database, managed through `psql` as `postgres`.
//!
//! Both resources only ever create. An existing role keeps its password and
//! an existing database keeps its owner.

use anyhow::Result;
use cmdkit::{CommandLine, RunOptions, Runner};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};

use crate::error::ConfigError;

/// PostgreSQL identifier length limit
pub const PG_IDENTIFIER_MAX_LENGTH: usize = 63;

const SUPERUSER: &str = "postgres";

/// Validate a PostgreSQL identifier.
///
/// Must be 1..=63 chars, start with a letter or underscore and contain only
/// ASCII alphanumerics, `_` or `$`.
pub fn validate_identifier(field: &'static str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::invalid(field, name, "cannot be empty"));
    }
    if name.len() > PG_IDENTIFIER_MAX_LENGTH {
        return Err(ConfigError::invalid(
            field,
            name,
            format!("exceeds {PG_IDENTIFIER_MAX_LENGTH} characters"),
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(ConfigError::invalid(
            field,
            name,
            "must start with a letter or underscore",
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '$')
    {
        return Err(ConfigError::invalid(
            field,
            name,
            format!("invalid character {bad:?} (allowed: a-z, A-Z, 0-9, _, $)"),
        ));
    }
    Ok(())
}

/// Quote an identifier for interpolation.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for interpolation.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn as_superuser() -> RunOptions {
    RunOptions::new().as_user(SUPERUSER)
}

/// Whether a single-row existence query returns `1`.
fn exists(runner: &dyn Runner, query: &str) -> Result<bool> {
    let out = runner.capture(
        &CommandLine::argv(["psql", "-tAc", query]),
        &as_superuser(),
    )?;
    Ok(out.lines().any(|line| line.trim() == "1"))
}

/// Login role owning the application database.
#[derive(Debug, Clone)]
pub struct DatabaseRole {
    pub name: String,
    pub password: String,
}

impl DatabaseRole {
    pub fn new(name: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            password: password.to_string(),
        }
    }

    fn exists(&self, runner: &dyn Runner) -> Result<bool> {
        exists(
            runner,
            &format!(
                "SELECT 1 FROM pg_roles WHERE rolname={}",
                quote_literal(&self.name)
            ),
        )
    }
}

impl Resource for DatabaseRole {
    fn id(&self) -> String {
        format!("database_role:{}", self.name)
    }

    fn description(&self) -> String {
        format!("PostgreSQL role {}", self.name)
    }

    fn resource_type(&self) -> &'static str {
        "database_role"
    }

    fn current_state(&self, runner: &dyn Runner) -> Result<ResourceState> {
        if self.exists(runner)? {
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

        validate_identifier("PT_DB_USER", &self.name)?;

        if self.exists(ctx.runner)? {
            log::info!("role {} exists; password left unchanged", self.name);
            return Ok(ApplyResult::NoChange);
        }

        let sql = format!(
            "CREATE USER {} WITH PASSWORD {};",
            quote_identifier(&self.name),
            quote_literal(&self.password)
        );
        ctx.runner.run(
            &CommandLine::argv(["psql", "-c", sql.as_str()]),
            &as_superuser().redacting(&self.password),
        )?;
        log::info!("created role {}", self.name);
        Ok(ApplyResult::Created)
    }
}

/// Application database owned by [`DatabaseRole`].
#[derive(Debug, Clone)]
pub struct Database {
    pub name: String,
    pub owner: String,
}

impl Database {
    pub fn new(name: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
        }
    }

    fn exists(&self, runner: &dyn Runner) -> Result<bool> {
        exists(
            runner,
            &format!(
                "SELECT 1 FROM pg_database WHERE datname={}",
                quote_literal(&self.name)
            ),
        )
    }
}

impl Resource for Database {
    fn id(&self) -> String {
        format!("database:{}", self.name)
    }

    fn description(&self) -> String {
        format!("PostgreSQL database {} owned by {}", self.name, self.owner)
    }

    fn resource_type(&self) -> &'static str {
        "database"
    }

    fn current_state(&self, runner: &dyn Runner) -> Result<ResourceState> {
        if self.exists(runner)? {
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

        validate_identifier("PT_DB_NAME", &self.name)?;
        validate_identifier("PT_DB_USER", &self.owner)?;

        if self.exists(ctx.runner)? {
            log::info!("database {} exists", self.name);
            return Ok(ApplyResult::NoChange);
        }

        let sql = format!(
            "CREATE DATABASE {} OWNER {};",
            quote_identifier(&self.name),
            quote_identifier(&self.owner)
        );
        ctx.runner
            .run(&CommandLine::argv(["psql", "-c", sql.as_str()]), &as_superuser())?;
        log::info!("created database {}", self.name);
        Ok(ApplyResult::Created)
    }
}
