//! Operator options.
//!
//! Options are assembled exactly once per run from a keyed defaults table,
//! overlaid in order by the process environment, an optional env-file and
//! `--key=value` arguments. Nothing else in the crate reads the environment.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Every recognized key with its default. Order is documentation order.
pub const DEFAULTS: &[(&str, &str)] = &[
    ("PT_DOMAIN", ""),
    ("PT_HTTPS", "false"),
    ("PT_WEB_PORT", "9000"),
    ("PT_USER", "peertube"),
    ("PT_HOME", "/var/www"),
    ("PT_BRANCH", "production"),
    ("PT_DB_HOST", "127.0.0.1"),
    ("PT_DB_PORT", "5432"),
    ("PT_DB_USER", "peertube"),
    ("PT_DB_PASS", "CHANGE_ME_DB_PASS"),
    ("PT_DB_NAME", "peertube"),
    ("PT_DB_SSL", "false"),
    ("PT_SMTP_HOST", ""),
    ("PT_SMTP_PORT", "587"),
    ("PT_SMTP_USER", ""),
    ("PT_SMTP_PASS", ""),
    ("PT_SMTP_TLS", "true"),
    ("PT_SMTP_DISABLE_STARTTLS", "false"),
    ("PT_FROM_ADDRESS", ""),
    ("PT_ADMIN_EMAIL", ""),
    ("PT_INSTANCE_NAME", "MyTube"),
    ("PT_INSTANCE_DESC", "Public PeerTube instance"),
    ("PT_LANGUAGES", "en,de,ar"),
    ("PT_RESOLUTIONS", "720p,1080p"),
    ("PT_KEEP_ORIGINAL", "false"),
    ("PT_SIGNUP_ENABLED", "false"),
    ("PT_SIGNUP_APPROVAL", "true"),
    ("PT_SIGNUP_VERIFY_EMAIL", "true"),
    ("PT_LOG_LEVEL", "info"),
];

const NUMERIC_KEYS: &[&str] = &["PT_WEB_PORT", "PT_DB_PORT", "PT_SMTP_PORT"];

/// Canonical truthy parser: `1`, `true`, `yes`, `y`, `on` in any case.
pub fn parse_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Whether `host` is a literal dotted-quad IPv4 address.
pub fn is_ipv4_literal(host: &str) -> bool {
    host.trim().parse::<Ipv4Addr>().is_ok()
}

/// Split a comma-separated list, dropping blanks and repeats (first wins).
pub fn parse_list(value: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|seen| seen == item) {
            items.push(item.to_string());
        }
    }
    items
}

/// Map an overlay key (`--db-pass`, `db_pass`, `PT_DB_PASS`) to a table key.
pub fn normalize_key(raw: &str) -> String {
    let key = raw
        .trim()
        .trim_start_matches('-')
        .replace('-', "_")
        .to_ascii_uppercase();
    if key.starts_with("PT_") {
        key
    } else {
        format!("PT_{key}")
    }
}

/// The keyed table options are built from.
#[derive(Debug, Clone)]
pub struct KeyTable {
    values: BTreeMap<String, String>,
}

impl Default for KeyTable {
    fn default() -> Self {
        Self {
            values: DEFAULTS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }
}

impl KeyTable {
    /// Set a key, ignoring unknown keys and keeping the previous value when a
    /// numeric key is not an integer.
    pub fn set(&mut self, key: &str, value: &str) {
        let Some(slot) = self.values.get_mut(key) else {
            log::debug!("ignoring unknown option {key}");
            return;
        };

        if NUMERIC_KEYS.contains(&key) && value.trim().parse::<i64>().is_err() {
            log::warn!("{key}={value:?} is not an integer; keeping {slot}");
            return;
        }

        *slot = value.to_string();
    }

    /// Overlay from an environment lookup.
    pub fn overlay_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (key, _) in DEFAULTS {
            if let Some(value) = lookup(key) {
                self.set(key, &value);
            }
        }
    }

    /// Overlay from `KEY=value` env-file content.
    pub fn overlay_env_file(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                self.set(key.trim(), value);
            }
        }
    }

    /// Overlay from `--key=value` / `KEY=value` arguments.
    ///
    /// A bare `--flag` sets the key to `true`. Unlike the environment and the
    /// env-file, an argument naming an unknown key is an error.
    pub fn overlay_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        for arg in args {
            let (key, value) = match arg.split_once('=') {
                Some((key, value)) => (normalize_key(key), value),
                None if arg.starts_with("--") => (normalize_key(arg), "true"),
                None => {
                    return Err(ConfigError::invalid(
                        "override",
                        arg,
                        "expected --key=value or KEY=value",
                    ));
                }
            };
            // Flags placed after the first override end up here too
            if !self.values.contains_key(&key) {
                return Err(ConfigError::invalid(
                    "override",
                    arg,
                    format!("{key} is not a known option; command flags go before overrides"),
                ));
            }
            self.set(&key, value);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> &str {
        self.values.get(key).map_or("", String::as_str)
    }

    fn flag(&self, key: &str) -> bool {
        parse_truthy(self.get(key))
    }

    fn int(&self, key: &str) -> i64 {
        // Only integers are ever stored for numeric keys
        self.get(key).trim().parse().unwrap_or_default()
    }

    fn text(&self, key: &str) -> String {
        self.get(key).trim().to_string()
    }
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub host: String,
    pub port: i64,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl: bool,
}

/// Outbound mail settings. Blank strings mean "not configured".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpOptions {
    pub host: String,
    pub port: i64,
    pub user: String,
    pub password: String,
    pub tls: bool,
    pub disable_starttls: bool,
    pub from_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOptions {
    pub name: String,
    pub description: String,
    /// Ordered, de-duplicated
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOptions {
    pub enabled: bool,
    pub requires_approval: bool,
    pub requires_email_verification: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingOptions {
    /// Requested tier labels as given by the operator
    pub resolutions: Vec<String>,
    pub keep_original: bool,
}

/// Everything a provisioning run is parameterized by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Public hostname; empty until resolved
    pub domain: String,
    pub https: bool,
    pub web_port: i64,
    pub user: String,
    pub home: PathBuf,
    /// Branch or tag to track; `None` follows the clone's default branch
    pub reference: Option<String>,
    pub database: DatabaseOptions,
    pub smtp: SmtpOptions,
    pub admin_email: String,
    pub instance: InstanceOptions,
    pub signup: SignupOptions,
    pub encoding: EncodingOptions,
    pub log_level: String,
}

impl Default for Options {
    fn default() -> Self {
        Self::from_table(&KeyTable::default())
    }
}

impl Options {
    /// Build from the environment lookup, an optional env-file and overlays.
    ///
    /// A missing env-file is only a warning.
    pub fn load(
        lookup: impl Fn(&str) -> Option<String>,
        env_file: Option<&Path>,
        overrides: &[String],
    ) -> Result<Self> {
        let mut table = KeyTable::default();
        table.overlay_env(lookup);

        if let Some(path) = env_file {
            if path.exists() {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::EnvFile {
                    path: path.to_path_buf(),
                    source,
                })?;
                table.overlay_env_file(&content);
                log::info!("Loaded options from {}", path.display());
            } else {
                log::warn!("{} not found; using defaults", path.display());
            }
        }

        table.overlay_args(overrides)?;
        Ok(Self::from_table(&table))
    }

    /// Build from a fully overlaid table.
    pub fn from_table(table: &KeyTable) -> Self {
        let reference = table.text("PT_BRANCH");

        Self {
            domain: table.text("PT_DOMAIN"),
            https: table.flag("PT_HTTPS"),
            web_port: table.int("PT_WEB_PORT"),
            user: table.text("PT_USER"),
            home: PathBuf::from(table.text("PT_HOME")),
            reference: (!reference.is_empty()).then_some(reference),
            database: DatabaseOptions {
                host: table.text("PT_DB_HOST"),
                port: table.int("PT_DB_PORT"),
                user: table.text("PT_DB_USER"),
                password: table.get("PT_DB_PASS").to_string(),
                name: table.text("PT_DB_NAME"),
                ssl: table.flag("PT_DB_SSL"),
            },
            smtp: SmtpOptions {
                host: table.text("PT_SMTP_HOST"),
                port: table.int("PT_SMTP_PORT"),
                user: table.text("PT_SMTP_USER"),
                password: table.get("PT_SMTP_PASS").to_string(),
                tls: table.flag("PT_SMTP_TLS"),
                disable_starttls: table.flag("PT_SMTP_DISABLE_STARTTLS"),
                from_address: table.text("PT_FROM_ADDRESS"),
            },
            admin_email: table.text("PT_ADMIN_EMAIL"),
            instance: InstanceOptions {
                name: table.text("PT_INSTANCE_NAME"),
                description: table.text("PT_INSTANCE_DESC"),
                languages: parse_list(table.get("PT_LANGUAGES")),
            },
            signup: SignupOptions {
                enabled: table.flag("PT_SIGNUP_ENABLED"),
                requires_approval: table.flag("PT_SIGNUP_APPROVAL"),
                requires_email_verification: table.flag("PT_SIGNUP_VERIFY_EMAIL"),
            },
            encoding: EncodingOptions {
                resolutions: parse_list(table.get("PT_RESOLUTIONS")),
                keep_original: table.flag("PT_KEEP_ORIGINAL"),
            },
            log_level: table.text("PT_LOG_LEVEL"),
        }
    }

    /// Copy with the domain fixed for the rest of the run.
    pub fn with_domain(self, domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..self
        }
    }

    /// The web port as a TCP port.
    pub fn web_port(&self) -> Result<u16, ConfigError> {
        port("PT_WEB_PORT", self.web_port)
    }

    /// Contact used for the admin account and certificate requests.
    pub fn admin_contact(&self) -> String {
        if self.admin_email.is_empty() {
            format!("admin@{}", self.domain)
        } else {
            self.admin_email.clone()
        }
    }

    /// `http` or `https`.
    pub fn scheme(&self) -> &'static str {
        if self.https { "https" } else { "http" }
    }
}

/// Validate an integer as a TCP port.
pub fn port(field: &'static str, value: i64) -> Result<u16, ConfigError> {
    u16::try_from(value)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ConfigError::invalid(field, value, "port must be between 1 and 65535"))
}
