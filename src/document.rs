//! The typed configuration document consumed by the provisioned service.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::error::ConfigError;

const HEADER: &str = "# Generated by tubestrap. Local edits are replaced on the next run.\n";

/// Transcoding tiers, in the order the service expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resolution {
    /// Audio only
    R0,
    R144,
    R240,
    R360,
    R480,
    R720,
    R1080,
    R1440,
    R2160,
}

impl Resolution {
    pub const ALL: [Self; 9] = [
        Self::R0,
        Self::R144,
        Self::R240,
        Self::R360,
        Self::R480,
        Self::R720,
        Self::R1080,
        Self::R1440,
        Self::R2160,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::R0 => "0p",
            Self::R144 => "144p",
            Self::R240 => "240p",
            Self::R360 => "360p",
            Self::R480 => "480p",
            Self::R720 => "720p",
            Self::R1080 => "1080p",
            Self::R1440 => "1440p",
            Self::R2160 => "2160p",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|r| r.label() == label)
    }
}

/// Enable flags over every tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionFlags {
    enabled: Vec<Resolution>,
}

impl ResolutionFlags {
    /// Map requested labels onto the fixed tiers. Unknown labels are dropped.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut enabled = Vec::new();
        for label in labels {
            let label = label.as_ref();
            match Resolution::from_label(label) {
                Some(r) if !enabled.contains(&r) => enabled.push(r),
                Some(_) => {}
                None => log::warn!("ignoring unknown resolution {label:?}"),
            }
        }
        enabled.sort();
        Self { enabled }
    }

    pub fn is_enabled(&self, resolution: Resolution) -> bool {
        self.enabled.contains(&resolution)
    }

    pub fn enabled(&self) -> &[Resolution] {
        &self.enabled
    }
}

impl Serialize for ResolutionFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Resolution::ALL.len()))?;
        for resolution in Resolution::ALL {
            map.serialize_entry(resolution.label(), &self.is_enabled(resolution))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Webserver {
    pub https: bool,
    pub hostname: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Secrets {
    pub peertube: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Database {
    pub hostname: String,
    pub port: u16,
    pub ssl: bool,
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redis {
    pub hostname: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Smtp {
    pub transport: String,
    pub hostname: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
    pub disable_starttls: bool,
    pub from_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signup {
    pub enabled: bool,
    pub requires_approval: bool,
    pub requires_email_verification: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Admin {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub name: String,
    pub description: String,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcoding {
    pub enabled: bool,
    pub keep_original_file: bool,
    pub resolutions: ResolutionFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    pub level: String,
}

/// The rendered `production.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub webserver: Webserver,
    pub secrets: Secrets,
    pub database: Database,
    pub redis: Redis,
    pub smtp: Smtp,
    pub signup: Signup,
    pub admin: Admin,
    pub instance: Instance,
    pub transcoding: Transcoding,
    pub log: Log,
}

impl Document {
    /// Serialize with the generated-file header.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let body = serde_yaml::to_string(self)?;
        Ok(format!("{HEADER}{body}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for resolution in Resolution::ALL {
            assert_eq!(Resolution::from_label(resolution.label()), Some(resolution));
        }
        assert_eq!(Resolution::from_label(" 720P "), Some(Resolution::R720));
        assert_eq!(Resolution::from_label("4k"), None);
    }

    #[test]
    fn test_empty_flags_list_every_tier_disabled() {
        let flags = ResolutionFlags::from_labels::<&str>(&[]);
        let yaml = serde_yaml::to_string(&flags).unwrap();

        let keys: Vec<&str> = yaml
            .lines()
            .map(|l| l.split(':').next().unwrap().trim_matches('\''))
            .collect();
        let expected: Vec<&str> = Resolution::ALL.iter().map(|r| r.label()).collect();
        assert_eq!(keys, expected);
        assert!(yaml.lines().all(|l| l.ends_with("false")));
    }

    #[test]
    fn test_flags_ignore_order_and_duplicates() {
        let flags = ResolutionFlags::from_labels(&["1080p", "720p", "1080p", "bogus"]);
        assert_eq!(flags.enabled(), &[Resolution::R720, Resolution::R1080]);

        let yaml = serde_yaml::to_string(&flags).unwrap();
        assert!(yaml.contains("720p: true"));
        assert!(yaml.contains("1080p: true"));
        assert!(yaml.contains("480p: false"));
        assert_eq!(yaml.matches("true").count(), 2);
    }
}
