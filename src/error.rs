//! Error taxonomy for a provisioning run.
//!
//! External tool failures are `cmdkit::Error::CommandFailed`; the types here
//! cover what happens before any command runs.

use std::path::PathBuf;
use thiserror::Error;

/// Options could not be turned into a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has a value the document cannot carry
    #[error("invalid {field} `{value}`: {reason}")]
    Invalid {
        /// Option key, e.g. `PT_WEB_PORT`
        field: &'static str,
        /// Offending value as given
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The env-file exists but could not be read
    #[error("cannot read {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document could not be serialized
    #[error("cannot serialize configuration document: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

impl ConfigError {
    pub fn invalid(field: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// The run needs administrative rights.
#[derive(Debug, Error)]
#[error("administrative privileges required: run tubestrap as root (e.g. `sudo tubestrap apply`)")]
pub struct PrivilegeRequired;

/// Fail with [`PrivilegeRequired`] unless running as root.
pub fn require_root() -> Result<(), PrivilegeRequired> {
    if cmdkit::is_root() {
        Ok(())
    } else {
        Err(PrivilegeRequired)
    }
}
